//! Framed transfer of fixed-length messages over a byte stream.
//!
//! TCP is a *stream* protocol: one `read()` may return part of a message and
//! one `write()` may accept only part of a buffer.  Because both protocols
//! use a fixed message length known to both sides, framing is simply
//! "transfer exactly N bytes": `read_exact` and `write_all` retry partial
//! transfers until the whole frame has moved or the stream fails.
//!
//! Every transfer is bounded by a timeout so a stalled peer cannot hold a
//! single-connection server forever.  A transport error aborts the exchange;
//! nothing here retries.
//!
//! The helpers are generic over `AsyncRead`/`AsyncWrite` so the same code
//! drives a `TcpStream` in production and a `tokio_test::io::Mock` in tests.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::protocol::attendance::{
    decode_attendance_reply, decode_attendance_request, encode_attendance, AttendanceMessage,
    AttendanceReply, AttendanceRequest, ATTENDANCE_MSG_LEN,
};
use crate::protocol::codec::ProtocolError;
use crate::protocol::identity::{
    decode_identity_reply, decode_identity_request, encode_identity, IdentityMessage, IdentityReply,
    IdentityRequest, IDENTITY_MSG_LEN,
};

/// Errors from a framed exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer did not complete the transfer in time.
    #[error("transfer timed out after {0:?}")]
    TimedOut(Duration),

    /// The peer closed the stream before a whole frame arrived.
    #[error("connection closed by peer")]
    Closed,

    /// A whole frame arrived but could not be decoded.
    #[error("protocol error: {0}")]
    Decode(#[from] ProtocolError),
}

impl TransportError {
    /// Returns `true` if the peer sent something it should not have, as
    /// opposed to the stream itself failing.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, TransportError::Decode(_))
    }
}

// ── Raw frames ────────────────────────────────────────────────────────────────

/// Reads exactly `N` bytes, or fails.
///
/// # Errors
///
/// - [`TransportError::Closed`] on end-of-stream before `N` bytes.
/// - [`TransportError::TimedOut`] if `io_timeout` expires.
/// - [`TransportError::Io`] for any other stream failure.
pub async fn read_frame<R, const N: usize>(
    reader: &mut R,
    io_timeout: Duration,
) -> Result<[u8; N], TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; N];
    match timeout(io_timeout, reader.read_exact(&mut buf)).await {
        Err(_) => Err(TransportError::TimedOut(io_timeout)),
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TransportError::Closed),
        Ok(Err(e)) => Err(TransportError::Io(e)),
        Ok(Ok(_)) => {
            trace!(len = N, "frame received");
            Ok(buf)
        }
    }
}

/// Writes all of `frame` and flushes, or fails.
///
/// # Errors
///
/// - [`TransportError::TimedOut`] if `io_timeout` expires.
/// - [`TransportError::Io`] for any stream failure.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8], io_timeout: Duration) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let transfer = async {
        writer.write_all(frame).await?;
        writer.flush().await
    };
    match timeout(io_timeout, transfer).await {
        Err(_) => Err(TransportError::TimedOut(io_timeout)),
        Ok(result) => {
            result.map_err(TransportError::Io)?;
            trace!(len = frame.len(), "frame sent");
            Ok(())
        }
    }
}

// ── Attendance ────────────────────────────────────────────────────────────────

/// Encodes and sends one attendance message.
///
/// # Errors
///
/// See [`write_frame`].
pub async fn send_attendance<W>(
    writer: &mut W,
    msg: impl Into<AttendanceMessage>,
    io_timeout: Duration,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_frame(writer, &encode_attendance(&msg.into()), io_timeout).await
}

/// Receives and decodes one attendance request.
///
/// # Errors
///
/// See [`read_frame`]; additionally [`TransportError::Decode`].
pub async fn recv_attendance_request<R>(reader: &mut R, io_timeout: Duration) -> Result<AttendanceRequest, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let frame = read_frame::<R, ATTENDANCE_MSG_LEN>(reader, io_timeout).await?;
    Ok(decode_attendance_request(&frame)?)
}

/// Receives and decodes one attendance reply.
///
/// # Errors
///
/// See [`read_frame`]; additionally [`TransportError::Decode`].
pub async fn recv_attendance_reply<R>(reader: &mut R, io_timeout: Duration) -> Result<AttendanceReply, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let frame = read_frame::<R, ATTENDANCE_MSG_LEN>(reader, io_timeout).await?;
    Ok(decode_attendance_reply(&frame)?)
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Encodes and sends one identity message.
///
/// # Errors
///
/// [`TransportError::Decode`] if the message cannot be encoded (e.g. a name
/// that is too long); otherwise see [`write_frame`].
pub async fn send_identity<W>(
    writer: &mut W,
    msg: impl Into<IdentityMessage>,
    io_timeout: Duration,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_identity(&msg.into())?;
    write_frame(writer, &frame, io_timeout).await
}

/// Receives and decodes one identity request.
///
/// # Errors
///
/// See [`read_frame`]; additionally [`TransportError::Decode`].
pub async fn recv_identity_request<R>(reader: &mut R, io_timeout: Duration) -> Result<IdentityRequest, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let frame = read_frame::<R, IDENTITY_MSG_LEN>(reader, io_timeout).await?;
    Ok(decode_identity_request(&frame)?)
}

/// Receives and decodes one identity reply.
///
/// # Errors
///
/// See [`read_frame`]; additionally [`TransportError::Decode`].
pub async fn recv_identity_reply<R>(reader: &mut R, io_timeout: Duration) -> Result<IdentityReply, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let frame = read_frame::<R, IDENTITY_MSG_LEN>(reader, io_timeout).await?;
    Ok(decode_identity_reply(&frame)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
