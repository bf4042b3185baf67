//! Length-prefixed frame codec.
//!
//! ```text
//! Frame := LEN (4 bytes, unsigned, little-endian) || PAYLOAD (LEN bytes)
//!
//! Example:
//! 05 00 00 00 68 65 6c 6c 6f    "hello"
//! ```
//!
//! There is no magic, version, or checksum; the length prefix is the whole
//! framing contract. A header declaring more than the configured maximum is
//! rejected before any body byte is read.

use crate::buffer::{FrameBuffer, HEADER_LEN};
use crate::error::{FrameError, TransferError};
use crate::transfer::{read_exact, write_exact};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{Read, Write};

/// Default maximum payload size in bytes.
pub const DEFAULT_MAX_MSG: usize = 4096;

/// Reads and writes frames for one connection.
///
/// Holds the receive buffer and a reusable send buffer, both sized from
/// `max_payload`, so steady-state exchanges do not allocate.
#[derive(Debug)]
pub struct FrameCodec {
    recv: FrameBuffer,
    send: BytesMut,
}

impl FrameCodec {
    /// Create a codec accepting payloads of up to `max_payload` bytes.
    pub fn new(max_payload: usize) -> Self {
        Self {
            recv: FrameBuffer::new(max_payload),
            send: BytesMut::with_capacity(HEADER_LEN + max_payload),
        }
    }

    pub fn max_payload(&self) -> usize {
        self.recv.max_payload()
    }

    /// Read and validate a frame header, returning the declared payload length.
    ///
    /// [`FrameError::Closed`] means the peer ended the stream cleanly between
    /// frames. A header of 1-3 bytes followed by end-of-stream is a
    /// [`FrameError::ShortRead`].
    pub fn read_header<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize, FrameError> {
        let header = self.recv.header_mut();
        read_exact(reader, header)?;

        let declared = (&header[..]).get_u32_le();
        let length = usize::try_from(declared).unwrap_or(usize::MAX);
        if length > self.max_payload() {
            return Err(FrameError::TooLarge {
                length,
                max: self.max_payload(),
            });
        }

        Ok(length)
    }

    /// Read a payload of `length` bytes whose header has already been read.
    ///
    /// End-of-stream anywhere inside the body is a truncation, never a clean
    /// close.
    pub fn read_body<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        length: usize,
    ) -> Result<&[u8], FrameError> {
        let body = self.recv.body_mut(length)?;
        match read_exact(reader, body) {
            Ok(()) => {}
            Err(TransferError::Closed) => {
                return Err(FrameError::ShortRead {
                    expected: length,
                    received: 0,
                })
            }
            Err(e) => return Err(e.into()),
        }
        self.recv.payload(length)
    }

    /// Read one complete frame and return its payload.
    pub fn decode_frame<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<&[u8], FrameError> {
        let length = self.read_header(reader)?;
        self.read_body(reader, length)
    }

    /// The payload of the most recently read frame of `length` bytes.
    pub fn payload(&self, length: usize) -> Result<&[u8], FrameError> {
        self.recv.payload(length)
    }

    /// Frame `payload` and write header and body in a single exact write.
    ///
    /// Returns the number of bytes put on the wire.
    pub fn encode_frame<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        payload: &[u8],
    ) -> Result<usize, FrameError> {
        let declared = checked_length(payload, self.max_payload())?;

        self.send.clear();
        self.send.reserve(HEADER_LEN + payload.len());
        self.send.put_u32_le(declared);
        self.send.put_slice(payload);

        write_exact(writer, &self.send)?;
        Ok(self.send.len())
    }
}

/// Frame `payload` into a freshly allocated buffer.
pub fn encode(payload: &[u8], max_payload: usize) -> Result<Bytes, FrameError> {
    let declared = checked_length(payload, max_payload)?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32_le(declared);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

fn checked_length(payload: &[u8], max_payload: usize) -> Result<u32, FrameError> {
    let too_large = || FrameError::TooLarge {
        length: payload.len(),
        max: max_payload,
    };
    if payload.len() > max_payload {
        return Err(too_large());
    }
    u32::try_from(payload.len()).map_err(|_| too_large())
}
