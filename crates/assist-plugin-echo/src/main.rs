//! Binary entrypoint for the echo reference plugin.

use std::io::{self, BufReader, Write};

use assist_plugin_echo::run;

fn main() {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    if let Err(error) = run(&mut reader, &mut writer) {
        writeln!(io::stderr().lock(), "{error}").ok();
        std::process::exit(1);
    }
}
