//! Request handlers.
//!
//! A handler turns one request payload into one response payload. It never
//! sees the stream or the framing, so any handler can be swapped in without
//! changing the wire guarantees.

use crate::error::HandlerError;
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

/// Application logic invoked once per decoded request frame.
pub trait Handler {
    fn handle(&mut self, request: &[u8]) -> Result<Bytes, HandlerError>;
}

impl<F> Handler for F
where
    F: FnMut(&[u8]) -> Bytes,
{
    fn handle(&mut self, request: &[u8]) -> Result<Bytes, HandlerError> {
        Ok(self(request))
    }
}

/// Logs what the client said and always answers `world`.
#[derive(Debug, Default)]
pub struct Greeting;

impl Handler for Greeting {
    fn handle(&mut self, request: &[u8]) -> Result<Bytes, HandlerError> {
        info!(request = %String::from_utf8_lossy(request), "client says");
        Ok(Bytes::from_static(b"world"))
    }
}

/// Answers with the request payload unchanged.
#[derive(Debug, Default)]
pub struct Echo;

impl Handler for Echo {
    fn handle(&mut self, request: &[u8]) -> Result<Bytes, HandlerError> {
        Ok(Bytes::copy_from_slice(request))
    }
}

/// Handler selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Reply `world` to every request
    #[default]
    Greeting,
    /// Reply with the request payload
    Echo,
}

impl HandlerKind {
    /// Build a fresh handler for one connection.
    pub fn build(self) -> Box<dyn Handler + Send> {
        match self {
            HandlerKind::Greeting => Box::new(Greeting),
            HandlerKind::Echo => Box::new(Echo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_replies_world() {
        let mut handler = Greeting;
        assert_eq!(&handler.handle(b"hello").unwrap()[..], b"world");
        assert_eq!(&handler.handle(b"").unwrap()[..], b"world");
    }

    #[test]
    fn test_greeting_accepts_non_utf8() {
        let mut handler = Greeting;
        assert_eq!(&handler.handle(&[0xff, 0xfe]).unwrap()[..], b"world");
    }

    #[test]
    fn test_echo_replies_request() {
        let mut handler = Echo;
        assert_eq!(&handler.handle(b"ping").unwrap()[..], b"ping");
        assert!(handler.handle(b"").unwrap().is_empty());
    }

    #[test]
    fn test_closure_is_handler() {
        let mut calls = 0;
        let mut handler = |request: &[u8]| {
            calls += 1;
            Bytes::from(request.to_ascii_uppercase())
        };
        assert_eq!(&handler.handle(b"abc").unwrap()[..], b"ABC");
        drop(handler);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_kind_builds_matching_handler() {
        let mut handler = HandlerKind::Echo.build();
        assert_eq!(&handler.handle(b"x").unwrap()[..], b"x");

        let mut handler = HandlerKind::default().build();
        assert_eq!(&handler.handle(b"x").unwrap()[..], b"world");
    }
}
