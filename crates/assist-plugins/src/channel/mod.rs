//! Request/reply channel over a plugin's standard streams.
//!
//! The channel owns the write side of the plugin's stdin. Replies reach it
//! through a queue fed by the supervisor's stdout reader thread, which is
//! the only code that reads the pipe. One request is in flight at a time;
//! callers serialise access by holding the channel behind a mutex.

use std::io::Write;
use std::process::ChildStdin;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::protocol::{CommandEnvelope, Frame};

const CHANNEL_TARGET: &str = "assist_plugins::channel";

/// Exclusive command channel to one plugin process.
#[derive(Debug)]
pub struct PluginChannel<W = ChildStdin> {
    name: String,
    writer: Option<W>,
    replies: Receiver<Frame>,
}

impl<W: Write> PluginChannel<W> {
    /// Creates a channel writing to `writer` and reading frames from
    /// `replies`.
    pub const fn new(name: String, writer: W, replies: Receiver<Frame>) -> Self {
        Self {
            name,
            writer: Some(writer),
            replies,
        }
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Sends one request and returns the plugin's single-frame reply.
    ///
    /// Frames left over from earlier exchanges are discarded first. The
    /// first frame after the request is the reply; a blank one, such as an
    /// empty line or a lone end marker, counts as no reply at all.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Io`] if the request cannot be written,
    /// [`ChannelError::NoReply`] if the plugin answers with nothing or its
    /// output closes first and [`ChannelError::MalformedReply`] if the
    /// reply is not JSON.
    pub fn send(&mut self, function: &str, params: Value) -> Result<Value, ChannelError> {
        self.write_request(function, params)?;
        let frame = self.next_reply()?;
        if frame.payload.is_empty() {
            debug!(target: CHANNEL_TARGET, plugin = %self.name, "plugin sent an empty reply");
            return Err(self.no_reply());
        }
        self.parse(frame)
    }

    /// Sends one request and collects a streamed reply.
    ///
    /// Frames are gathered until one closed by the end marker arrives or the
    /// plugin's output closes. Blank frames contribute no value; a blank
    /// terminal frame still ends the stream.
    ///
    /// # Errors
    ///
    /// As [`PluginChannel::send`]; [`ChannelError::NoReply`] is returned only
    /// when nothing at all was received.
    pub fn send_streaming(
        &mut self,
        function: &str,
        params: Value,
    ) -> Result<Vec<Value>, ChannelError> {
        self.write_request(function, params)?;
        let mut values = Vec::new();
        loop {
            let Ok(frame) = self.replies.recv() else {
                if values.is_empty() {
                    return Err(self.no_reply());
                }
                debug!(
                    target: CHANNEL_TARGET,
                    plugin = %self.name,
                    frames = values.len(),
                    "plugin output closed before end marker"
                );
                return Ok(values);
            };
            let terminal = frame.terminal;
            if !frame.payload.is_empty() {
                values.push(self.parse(frame)?);
            }
            if terminal {
                return Ok(values);
            }
        }
    }

    /// Drops the write side of the pipe so the plugin reads end of input.
    pub fn close_input(&mut self) {
        if self.writer.take().is_some() {
            debug!(target: CHANNEL_TARGET, plugin = %self.name, "closed plugin stdin");
        }
    }

    fn write_request(&mut self, function: &str, params: Value) -> Result<(), ChannelError> {
        self.discard_stale();
        let line = CommandEnvelope::single(function, params)
            .to_line()
            .map_err(|source| ChannelError::Serialize {
                name: self.name.clone(),
                source: Arc::new(source),
            })?;

        let Some(writer) = self.writer.as_mut() else {
            return Err(ChannelError::NotRunning {
                name: self.name.clone(),
                source: None,
            });
        };

        debug!(
            target: CHANNEL_TARGET,
            plugin = %self.name,
            function,
            request_bytes = line.len(),
            "sending request"
        );
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|source| ChannelError::Io {
                name: self.name.clone(),
                source: Arc::new(source),
            })
    }

    fn discard_stale(&self) {
        loop {
            match self.replies.try_recv() {
                Ok(frame) if frame.payload.is_empty() => {
                    debug!(target: CHANNEL_TARGET, plugin = %self.name, "discarding blank frame");
                }
                Ok(frame) => warn!(
                    target: CHANNEL_TARGET,
                    plugin = %self.name,
                    payload = %frame.payload,
                    "discarding unsolicited plugin output"
                ),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return,
            }
        }
    }

    fn next_reply(&self) -> Result<Frame, ChannelError> {
        self.replies.recv().map_err(|_| self.no_reply())
    }

    fn no_reply(&self) -> ChannelError {
        ChannelError::NoReply {
            name: self.name.clone(),
        }
    }

    fn parse(&self, frame: Frame) -> Result<Value, ChannelError> {
        serde_json::from_str(&frame.payload).map_err(|source| ChannelError::MalformedReply {
            name: self.name.clone(),
            reply: frame.payload,
            source: Arc::new(source),
        })
    }
}
