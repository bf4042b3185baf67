//! Exact-length transfers over a byte stream.
//!
//! `read`/`write` on a socket may move fewer bytes than asked for. These
//! helpers loop until the whole buffer has been moved, or report precisely
//! how the stream fell short.

use crate::error::TransferError;
use std::io::{ErrorKind, Read, Write};

/// Fill `buf` completely from `reader`.
///
/// Returns [`TransferError::Closed`] if the stream is at end-of-stream before
/// the first byte, and [`TransferError::ShortRead`] if it ends after some but
/// not all of the bytes arrived.
pub fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransferError> {
    let expected = buf.len();
    let mut received = 0;

    while received < expected {
        match reader.read(&mut buf[received..]) {
            Ok(0) if received == 0 => return Err(TransferError::Closed),
            Ok(0) => return Err(TransferError::ShortRead { expected, received }),
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Io(e)),
        }
    }

    Ok(())
}

/// Write all of `buf` to `writer`.
///
/// An underlying write that reports zero progress fails with
/// [`TransferError::ShortWrite`] rather than spinning.
pub fn write_exact<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<(), TransferError> {
    let expected = buf.len();
    let mut written = 0;

    while written < expected {
        match writer.write(&buf[written..]) {
            Ok(0) => return Err(TransferError::ShortWrite { expected, written }),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Io(e)),
        }
    }

    Ok(())
}
