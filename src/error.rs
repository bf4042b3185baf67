//! Error types for the transfer, framing, and connection layers.
//!
//! Every error can be classified with [`ErrorClass`] so the listener can
//! tell a peer that hung up between frames from one that broke the protocol.

use std::io;
use thiserror::Error;

/// Coarse classification of a failure on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Peer closed the stream at a frame boundary. Not a failure.
    TransportClosed,
    /// Stream ended or stalled partway through a transfer.
    TransportTruncated,
    /// Peer declared a frame the codec refuses to read.
    ProtocolViolation,
    /// The request handler could not produce a valid response.
    HandlerFailure,
    /// Underlying socket error.
    Transport,
}

/// Failure of an exact-length read or write.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("connection closed by peer")]
    Closed,

    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransferError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TransferError::Closed => ErrorClass::TransportClosed,
            TransferError::ShortRead { .. } | TransferError::ShortWrite { .. } => {
                ErrorClass::TransportTruncated
            }
            TransferError::Io(_) => ErrorClass::Transport,
        }
    }
}

/// Failure while decoding or encoding a frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("connection closed by peer")]
    Closed,

    #[error("frame truncated: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },

    #[error("frame too large: {length} bytes (max: {max})")]
    TooLarge { length: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FrameError::Closed => ErrorClass::TransportClosed,
            FrameError::ShortRead { .. } | FrameError::ShortWrite { .. } => {
                ErrorClass::TransportTruncated
            }
            FrameError::TooLarge { .. } => ErrorClass::ProtocolViolation,
            FrameError::Io(_) => ErrorClass::Transport,
        }
    }
}

impl From<TransferError> for FrameError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Closed => FrameError::Closed,
            TransferError::ShortRead { expected, received } => {
                FrameError::ShortRead { expected, received }
            }
            TransferError::ShortWrite { expected, written } => {
                FrameError::ShortWrite { expected, written }
            }
            TransferError::Io(e) => FrameError::Io(e),
        }
    }
}

/// Failure reported by a request handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("response too large: {length} bytes (max: {max})")]
    ResponseTooLarge { length: usize, max: usize },

    #[error("handler failed: {0}")]
    Failed(String),
}

/// Reason a connection stopped serving before a clean close.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl ConnectionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConnectionError::Frame(e) => e.class(),
            ConnectionError::Handler(_) => ErrorClass::HandlerFailure,
        }
    }
}
