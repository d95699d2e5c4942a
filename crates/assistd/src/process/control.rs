//! JSON-lines command session over a pair of byte streams.

use std::io::{self, BufRead, Write};

use tracing::debug;

use super::{PROCESS_TARGET, ShutdownCause};
use crate::dispatch::{CommandHandler, Flow};

/// Input and output of a command session.
pub struct ControlStreams {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl ControlStreams {
    /// Wraps arbitrary streams.
    #[must_use]
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    /// Uses the daemon's own stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Box::new(io::BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    pub(super) fn serve(self, handler: &CommandHandler<'_>) -> io::Result<ShutdownCause> {
        let Self { input, mut output } = self;
        serve_commands(handler, input, &mut output)
    }
}

/// Answers one JSON outcome line per command line read from `input`.
///
/// Blank lines are skipped. The session ends after a `shutdown` command or
/// at end of input.
///
/// # Errors
///
/// Returns any I/O error raised by either stream.
pub fn serve_commands<R, W>(
    handler: &CommandHandler<'_>,
    input: R,
    output: &mut W,
) -> io::Result<ShutdownCause>
where
    R: BufRead,
    W: Write + ?Sized,
{
    for read in input.lines() {
        let line = read?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let (outcome, flow) = handler.handle_line(command);
        serde_json::to_writer(&mut *output, &outcome)?;
        output.write_all(b"\n")?;
        output.flush()?;
        if flow == Flow::Stop {
            return Ok(ShutdownCause::Command);
        }
    }
    debug!(target: PROCESS_TARGET, "control input closed");
    Ok(ShutdownCause::InputClosed)
}
