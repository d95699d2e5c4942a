//! Reference plugin speaking the assist host's wire protocol.
//!
//! The plugin serves requests until its stdin closes or it is asked to shut
//! down. Each request is one `{"tool_calls": [...]}` line; each reply is one
//! or more JSON frames, the last of which is closed by the end marker.
//!
//! Functions:
//!
//! - `echo` returns the call's properties untouched;
//! - `stream` emits `count` progress frames before its final reply;
//! - `shutdown` acknowledges and ends the serve loop.

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};

use assist_plugins::protocol::{CommandEnvelope, END_MARKER, ToolCall};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const DEFAULT_STREAM_COUNT: u64 = 3;
const MAX_STREAM_COUNT: u64 = 100;

/// Errors that end the serve loop.
#[derive(Debug, Error)]
pub enum PluginDispatchError {
    /// Reading a request from stdin failed.
    #[error("failed to read plugin request: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Writing a reply to stdout failed.
    #[error("failed to write plugin response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serialising a reply failed.
    #[error("failed to serialize plugin response: {source}")]
    Serialize {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// One JSON reply frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// Whether the call succeeded.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
    /// Echoed properties, for `echo` calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<Value>,
}

impl Reply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            echo: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            echo: None,
        }
    }
}

/// Functions the plugin understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Return the properties.
    Echo {
        /// Call properties.
        properties: Value,
    },
    /// Emit progress frames, then a final reply.
    Stream {
        /// Number of progress frames.
        count: u64,
        /// Text included in each progress frame.
        text: String,
    },
    /// Acknowledge and stop serving.
    Shutdown,
}

impl Command {
    /// Maps a tool call onto a command.
    ///
    /// # Errors
    ///
    /// Returns a message naming the unknown function or bad argument.
    pub fn from_call(call: &ToolCall) -> Result<Self, String> {
        match call.func.as_str() {
            "echo" => Ok(Self::Echo {
                properties: call.properties.clone(),
            }),
            "stream" => {
                let count = match call.properties.get("count") {
                    None => DEFAULT_STREAM_COUNT,
                    Some(value) => value
                        .as_u64()
                        .filter(|requested| *requested <= MAX_STREAM_COUNT)
                        .ok_or_else(|| {
                            format!("'count' must be an integer from 0 to {MAX_STREAM_COUNT}")
                        })?,
                };
                let text = call
                    .properties
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("tick")
                    .to_owned();
                Ok(Self::Stream { count, text })
            }
            "shutdown" => Ok(Self::Shutdown),
            other => Err(format!("unknown function '{other}'")),
        }
    }
}

/// Frames produced for one request and whether serving should continue.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Non-terminal progress frames, in order.
    pub progress: Vec<Reply>,
    /// Final frame, written with the end marker.
    pub last: Reply,
    /// Whether the serve loop should stop after writing.
    pub stop: bool,
}

impl Response {
    const fn single(last: Reply) -> Self {
        Self {
            progress: Vec::new(),
            last,
            stop: false,
        }
    }
}

/// Executes a command.
#[must_use]
pub fn execute(command: Command) -> Response {
    match command {
        Command::Echo { properties } => Response::single(Reply {
            echo: Some(properties),
            ..Reply::ok("echo")
        }),
        Command::Stream { count, text } => Response {
            progress: (1..=count)
                .map(|index| Reply::ok(format!("{text} {index}")))
                .collect(),
            last: Reply::ok(format!("streamed {count} frames")),
            stop: false,
        },
        Command::Shutdown => Response {
            progress: Vec::new(),
            last: Reply::ok("shutting down"),
            stop: true,
        },
    }
}

/// Turns one request line into a response. Bad input yields a failure
/// reply rather than an error so the host always hears back.
#[must_use]
pub fn handle_line(line: &str) -> Response {
    let envelope: CommandEnvelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(error) => return Response::single(Reply::failure(format!("invalid request: {error}"))),
    };
    let Some(call) = envelope.first_call() else {
        return Response::single(Reply::failure("request has no tool calls"));
    };
    match Command::from_call(call) {
        Ok(command) => execute(command),
        Err(message) => Response::single(Reply::failure(message)),
    }
}

/// Serves requests from `stdin` until end of input or a `shutdown` call.
///
/// # Errors
///
/// Returns an error if a request cannot be read or a reply cannot be
/// written.
pub fn run(stdin: &mut impl BufRead, stdout: &mut impl Write) -> Result<(), PluginDispatchError> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = stdin
            .read_line(&mut line)
            .map_err(|source| PluginDispatchError::Read { source })?;
        if read == 0 {
            return Ok(());
        }
        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        let response = handle_line(request);
        write_response(stdout, &response)?;
        if response.stop {
            return Ok(());
        }
    }
}

fn write_response(stdout: &mut impl Write, response: &Response) -> Result<(), PluginDispatchError> {
    for frame in &response.progress {
        write_frame(stdout, frame, "\n")?;
    }
    write_frame(stdout, &response.last, END_MARKER)?;
    stdout
        .flush()
        .map_err(|source| PluginDispatchError::Write { source })
}

fn write_frame(
    stdout: &mut impl Write,
    reply: &Reply,
    delimiter: &str,
) -> Result<(), PluginDispatchError> {
    let payload =
        serde_json::to_string(reply).map_err(|source| PluginDispatchError::Serialize { source })?;
    stdout
        .write_all(payload.as_bytes())
        .and_then(|()| stdout.write_all(delimiter.as_bytes()))
        .map_err(|source| PluginDispatchError::Write { source })
}
