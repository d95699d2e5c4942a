//! Binary entrypoint for the plugin host daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match assistd::run_daemon() {
        Ok(exit) if exit.report.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            writeln!(io::stderr().lock(), "assistd: {}", assistd::error_chain(&error)).ok();
            ExitCode::FAILURE
        }
    }
}
