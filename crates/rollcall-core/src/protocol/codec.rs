//! Shared pieces of the two binary codecs: the error type and the
//! big-endian field readers.
//!
//! All multi-byte integers on both wires are big-endian.  Encoding is done
//! in place with `to_be_bytes`; decoding goes through the `read_*` helpers
//! below, which bounds-check before touching the slice.

use thiserror::Error;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the fixed message length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The opcode field of a request is not a recognised value.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(i32),

    /// The status field of a reply is not a recognised value.
    #[error("unknown status: {0}")]
    UnknownStatus(i32),

    /// A field value is out of range or otherwise unusable.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A name does not fit in the identity message.
    #[error("name is {len} bytes; at most {max} fit in a message")]
    NameTooLong { len: usize, max: usize },
}

/// Which way a message travels.
///
/// The same byte layout carries either a request (leading field is an
/// opcode) or a reply (leading field is a status), so a decoder must be told
/// which one it is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Reply,
}

pub(crate) fn require_len(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], ProtocolError> {
    require_len(buf, offset + N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    Ok(out)
}

pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    require_len(buf, offset + 1)?;
    Ok(buf[offset])
}

pub(crate) fn read_i32(buf: &[u8], offset: usize) -> Result<i32, ProtocolError> {
    read_array::<4>(buf, offset).map(i32::from_be_bytes)
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    read_array::<4>(buf, offset).map(u32::from_be_bytes)
}

pub(crate) fn read_i64(buf: &[u8], offset: usize) -> Result<i64, ProtocolError> {
    read_array::<8>(buf, offset).map(i64::from_be_bytes)
}

pub(crate) fn read_octets<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], ProtocolError> {
    read_array::<N>(buf, offset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
