//! Per-connection serving loop.
//!
//! A connection moves through a fixed cycle of states for every exchange:
//!
//! ```text
//! AwaitingHeader -> AwaitingBody -> Processing -> Replying -> AwaitingHeader
//! ```
//!
//! Clean end-of-stream at `AwaitingHeader`, or any error in any state, moves
//! it to `Closed`. The next request header is not read until the previous
//! reply has been fully written.
//!
//! Nothing here is shared between connections, so the same code runs whether
//! connections are served one at a time or each on its own thread.

use crate::codec::FrameCodec;
use crate::error::{ConnectionError, FrameError, HandlerError};
use crate::handler::Handler;
use bytes::Bytes;
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Waiting for the next 4-byte header.
    AwaitingHeader,
    /// Header validated, reading the body.
    AwaitingBody {
        /// Declared payload length.
        length: usize,
    },
    /// Body read, handler about to run.
    Processing,
    /// Writing the handler's response frame.
    Replying,
    /// Connection is finished.
    Closed,
}

/// Per-connection counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Completed request/response exchanges.
    pub exchanges: u64,
    /// Bytes read, headers included.
    pub bytes_read: u64,
    /// Bytes written, headers included.
    pub bytes_written: u64,
}

/// A single client connection and its framing state.
pub struct Connection<S> {
    stream: S,
    codec: FrameCodec,
    state: ConnState,
    /// Length of the request held in the codec while processing.
    request_len: usize,
    /// Response waiting to be written while replying.
    reply: Bytes,
    stats: ConnectionStats,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an open stream, accepting payloads up to `max_payload` bytes.
    pub fn new(stream: S, max_payload: usize) -> Self {
        Self {
            stream,
            codec: FrameCodec::new(max_payload),
            state: ConnState::AwaitingHeader,
            request_len: 0,
            reply: Bytes::new(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Run exchanges until the peer closes the stream or an error occurs.
    ///
    /// Consumes the connection: the stream is dropped, and so closed, exactly
    /// once whichever way this returns. A clean close yields the final stats.
    pub fn serve<H>(mut self, handler: &mut H) -> Result<ConnectionStats, ConnectionError>
    where
        H: Handler + ?Sized,
    {
        loop {
            match self.step(handler) {
                Ok(ConnState::Closed) => {
                    debug!(
                        exchanges = self.stats.exchanges,
                        bytes_read = self.stats.bytes_read,
                        bytes_written = self.stats.bytes_written,
                        "Connection closed by peer"
                    );
                    return Ok(self.stats);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        state = ?self.state,
                        exchanges = self.stats.exchanges,
                        error = %e,
                        "Connection failed"
                    );
                    self.state = ConnState::Closed;
                    return Err(e);
                }
            }
        }
    }

    /// Perform the work of the current state and move to the next one.
    pub fn step<H>(&mut self, handler: &mut H) -> Result<ConnState, ConnectionError>
    where
        H: Handler + ?Sized,
    {
        let next = match self.state {
            ConnState::AwaitingHeader => match self.codec.read_header(&mut self.stream) {
                Ok(length) => {
                    self.stats.bytes_read += crate::buffer::HEADER_LEN as u64;
                    ConnState::AwaitingBody { length }
                }
                Err(FrameError::Closed) => ConnState::Closed,
                Err(e) => return Err(e.into()),
            },
            ConnState::AwaitingBody { length } => {
                self.codec.read_body(&mut self.stream, length)?;
                self.stats.bytes_read += length as u64;
                self.request_len = length;
                ConnState::Processing
            }
            ConnState::Processing => {
                let request = self.codec.payload(self.request_len)?;
                let reply = handler.handle(request)?;
                let max = self.codec.max_payload();
                if reply.len() > max {
                    return Err(HandlerError::ResponseTooLarge {
                        length: reply.len(),
                        max,
                    }
                    .into());
                }
                self.reply = reply;
                ConnState::Replying
            }
            ConnState::Replying => {
                let written = self.codec.encode_frame(&mut self.stream, &self.reply)?;
                self.stats.bytes_written += written as u64;
                self.stats.exchanges += 1;
                self.reply = Bytes::new();
                ConnState::AwaitingHeader
            }
            ConnState::Closed => ConnState::Closed,
        };

        trace!(from = ?self.state, to = ?next, "State transition");
        self.state = next;
        Ok(next)
    }
}
