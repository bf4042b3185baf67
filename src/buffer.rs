//! Bounds-checked receive buffer for one connection.
//!
//! A single allocation of `HEADER_LEN + max_payload` bytes is made when the
//! connection is set up and reused for every frame. The declared length is
//! checked against `max_payload` before any body slice is handed out, so a
//! forged header can never cause an oversized read or allocation.

use crate::error::FrameError;

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Fixed-capacity buffer holding one frame's header and body.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Header bytes followed by up to `max_payload` body bytes.
    data: Vec<u8>,
    /// Largest body the buffer will expose.
    max_payload: usize,
}

impl FrameBuffer {
    /// Create a buffer able to hold a frame with up to `max_payload` body bytes.
    pub fn new(max_payload: usize) -> Self {
        Self {
            data: vec![0u8; HEADER_LEN + max_payload],
            max_payload,
        }
    }

    /// Largest body the buffer accepts.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// The header region.
    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.data[..HEADER_LEN]
    }

    /// The first `len` body bytes, for filling from the stream.
    ///
    /// Fails with [`FrameError::TooLarge`] if `len` exceeds the payload limit.
    pub fn body_mut(&mut self, len: usize) -> Result<&mut [u8], FrameError> {
        self.check(len)?;
        Ok(&mut self.data[HEADER_LEN..HEADER_LEN + len])
    }

    /// The first `len` body bytes, as last filled.
    pub fn payload(&self, len: usize) -> Result<&[u8], FrameError> {
        self.check(len)?;
        Ok(&self.data[HEADER_LEN..HEADER_LEN + len])
    }

    fn check(&self, len: usize) -> Result<(), FrameError> {
        if len > self.max_payload {
            return Err(FrameError::TooLarge {
                length: len,
                max: self.max_payload,
            });
        }
        Ok(())
    }
}
