//! Length-prefixed request/response framing over a byte stream.
//!
//! - [`transfer`]: exact-length reads and writes
//! - [`codec`]: frame encode/decode with a payload size limit
//! - [`connection`]: the per-connection serving loop
//! - [`handler`]: request handlers invoked once per frame
//! - [`server`]: TCP listener that feeds connections to the loop

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod server;
pub mod transfer;

pub use codec::{FrameCodec, DEFAULT_MAX_MSG};
pub use config::{Config, ServeMode};
pub use connection::{ConnState, Connection, ConnectionStats};
pub use error::{ConnectionError, ErrorClass, FrameError, HandlerError, TransferError};
pub use handler::{Handler, HandlerKind};
pub use server::Server;
