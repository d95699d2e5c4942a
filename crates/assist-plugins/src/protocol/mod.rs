//! Wire protocol spoken between the host and plugin processes.
//!
//! Requests are one JSON line on the plugin's stdin:
//!
//! ```text
//! {"tool_calls":[{"func":"forecast","properties":{"city":"Oslo"}}]}
//! ```
//!
//! Replies arrive on stdout as frames. A frame ends at a newline or at an
//! [`END_MARKER`] outside any JSON string; a frame closed by the marker is
//! *terminal* and ends a streamed reply. Single replies are one frame of
//! either kind.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker that closes the final frame of a reply.
pub const END_MARKER: &str = "<<END>>";

const READ_CHUNK: usize = 4096;

/// One function invocation inside a request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Function name.
    pub func: String,
    /// Arguments, always a JSON object.
    pub properties: Value,
}

impl ToolCall {
    /// Builds a call, mapping `null` arguments to an empty object.
    #[must_use]
    pub fn new(func: impl Into<String>, properties: Value) -> Self {
        let arguments = match properties {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            func: func.into(),
            properties: arguments,
        }
    }
}

/// Request written to a plugin's stdin.
///
/// # Example
///
/// ```
/// use assist_plugins::protocol::CommandEnvelope;
/// use serde_json::json;
///
/// let envelope = CommandEnvelope::single("echo", json!({"a": 1}));
/// assert_eq!(
///     envelope.to_line().expect("serialises"),
///     r#"{"tool_calls":[{"func":"echo","properties":{"a":1}}]}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Calls in the request. Plugins act on the first one only.
    pub tool_calls: Vec<ToolCall>,
}

impl CommandEnvelope {
    /// Wraps a single call.
    #[must_use]
    pub fn single(func: impl Into<String>, properties: Value) -> Self {
        Self {
            tool_calls: vec![ToolCall::new(func, properties)],
        }
    }

    /// Returns the call a plugin should act on.
    #[must_use]
    pub fn first_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }

    /// Encodes the envelope as one JSON line without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the encoder error; unreachable for well-formed `Value`s.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One unit of plugin output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame text with the delimiter and surrounding whitespace removed.
    pub payload: String,
    /// Whether the frame was closed by [`END_MARKER`].
    pub terminal: bool,
}

impl Frame {
    /// Builds a frame.
    #[must_use]
    pub fn new(payload: impl Into<String>, terminal: bool) -> Self {
        Self {
            payload: payload.into(),
            terminal,
        }
    }
}

/// Splits a byte stream into [`Frame`]s.
///
/// A newline always ends a frame, since JSON never carries a raw newline.
/// The end marker ends a frame only outside a JSON string, so a reply may
/// quote the marker. Blank frames are passed on; it is up to the reader
/// of a reply to decide what an empty answer means. Bytes left over when
/// the stream ends are emitted as a final non-terminal frame.
///
/// Each byte is examined once, however the stream is chunked.
///
/// # Example
///
/// ```
/// use assist_plugins::protocol::{Frame, FrameReader};
///
/// let mut reader = FrameReader::new(&b"{\"a\":\"<<END>>\"}\n{\"b\":2}<<END>>"[..]);
/// let first = reader.next_frame().expect("in-memory read");
/// assert_eq!(first, Some(Frame::new("{\"a\":\"<<END>>\"}", false)));
/// let last = reader.next_frame().expect("in-memory read");
/// assert_eq!(last, Some(Frame::new("{\"b\":2}", true)));
/// assert_eq!(reader.next_frame().expect("in-memory read"), None);
/// ```
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    pending: Vec<u8>,
    scan: Scan,
    eof: bool,
}

/// Progress through the unframed bytes in `pending`.
#[derive(Debug, Default, Clone, Copy)]
struct Scan {
    offset: usize,
    in_string: bool,
    escaped: bool,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `inner`.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            scan: Scan {
                offset: 0,
                in_string: false,
                escaped: false,
            },
            eof: false,
        }
    }

    /// Returns the next frame, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates read failures other than interruption.
    pub fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        loop {
            if let Some((end, delimiter)) = self.find_delimiter() {
                let raw: Vec<u8> = self.pending.drain(..end + delimiter.len()).collect();
                self.scan = Scan::default();
                let payload = decode(raw.get(..end).unwrap_or_default());
                return Ok(Some(Frame::new(payload, delimiter.terminal())));
            }

            if self.eof {
                self.scan = Scan::default();
                let raw = std::mem::take(&mut self.pending);
                let payload = decode(&raw);
                if payload.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(Frame::new(payload, false)));
            }

            self.fill()?;
        }
    }

    /// Scans bytes not yet examined for the next delimiter.
    ///
    /// Stops short of a possible marker split across reads until more input
    /// arrives or the stream ends.
    fn find_delimiter(&mut self) -> Option<(usize, Delimiter)> {
        let marker = END_MARKER.as_bytes();
        while let Some(&byte) = self.pending.get(self.scan.offset) {
            let at = self.scan.offset;
            if byte == b'\n' {
                return Some((at, Delimiter::Newline));
            }
            if self.scan.in_string {
                if self.scan.escaped {
                    self.scan.escaped = false;
                } else if byte == b'\\' {
                    self.scan.escaped = true;
                } else if byte == b'"' {
                    self.scan.in_string = false;
                }
            } else if byte == b'"' {
                self.scan.in_string = true;
            } else if marker.first() == Some(&byte) {
                match self.pending.get(at..at + marker.len()) {
                    Some(window) if window == marker => return Some((at, Delimiter::Marker)),
                    None if !self.eof => {
                        let tail = self.pending.get(at..).unwrap_or_default();
                        if marker.starts_with(tail) {
                            return None;
                        }
                    }
                    _ => {}
                }
            }
            self.scan.offset += 1;
        }
        None
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(read) => {
                    self.pending.extend_from_slice(chunk.get(..read).unwrap_or_default());
                    return Ok(());
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = io::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Newline,
    Marker,
}

impl Delimiter {
    const fn len(self) -> usize {
        match self {
            Self::Newline => 1,
            Self::Marker => END_MARKER.len(),
        }
    }

    const fn terminal(self) -> bool {
        matches!(self, Self::Marker)
    }
}

fn decode(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_owned()
}
