//! The attendance wire format.
//!
//! Every attendance message, in either direction, is exactly 28 bytes:
//!
//! ```text
//! offset  size  field
//!      0     4  opcode (request) or status (reply)     i32
//!      4     4  auth response (request) or challenge    u32
//!      8     8  seconds                                 i64
//!     16     8  microseconds                            i64
//!     24     4  id                                      i32
//! ```
//!
//! All fields are big-endian.  Fields a given variant does not use are
//! encoded as zero and ignored on decode.

use std::fmt;

use crate::domain::mark::{AttendanceMark, Timestamp};
use crate::protocol::codec::{read_i32, read_i64, read_u32, require_len, Direction, ProtocolError};

/// Length in bytes of every attendance message.
pub const ATTENDANCE_MSG_LEN: usize = 28;

const OFF_CODE: usize = 0;
const OFF_AUTH: usize = 4;
const OFF_SECS: usize = 8;
const OFF_MICROS: usize = 16;
const OFF_ID: usize = 24;

// ── Codes ─────────────────────────────────────────────────────────────────────

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AttendanceOpcode {
    Mark = 0,
    Close = 1,
    Auth = 2,
}

impl TryFrom<i32> for AttendanceOpcode {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AttendanceOpcode::Mark),
            1 => Ok(AttendanceOpcode::Close),
            2 => Ok(AttendanceOpcode::Auth),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// Reply status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AttendanceStatus {
    Present = 0,
    Absent = 1,
    Late = 2,
    Challenge = 3,
    Deny = 4,
    Time = 5,
    Data = 6,
    EndData = 7,
}

impl TryFrom<i32> for AttendanceStatus {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AttendanceStatus::Present),
            1 => Ok(AttendanceStatus::Absent),
            2 => Ok(AttendanceStatus::Late),
            3 => Ok(AttendanceStatus::Challenge),
            4 => Ok(AttendanceStatus::Deny),
            5 => Ok(AttendanceStatus::Time),
            6 => Ok(AttendanceStatus::Data),
            7 => Ok(AttendanceStatus::EndData),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttendanceStatus::Present => "Attendance marked: present.",
            AttendanceStatus::Absent => "Attendance is closed: marked absent.",
            AttendanceStatus::Late => "Attendance marked: late.",
            AttendanceStatus::Challenge => "Server issued an authentication challenge.",
            AttendanceStatus::Deny => "Request denied by the server.",
            AttendanceStatus::Time => "Server time follows.",
            AttendanceStatus::Data => "Attendance record follows.",
            AttendanceStatus::EndData => "End of attendance records.",
        };
        f.write_str(text)
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// A request from a client to the attendance server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceRequest {
    /// Mark `id` present at the given time.  `id` must be non-zero.
    Mark(AttendanceMark),
    /// Begin the close handshake.
    Close,
    /// Answer the challenge issued in reply to [`AttendanceRequest::Close`].
    Auth { response: u32 },
}

impl AttendanceRequest {
    pub fn opcode(&self) -> AttendanceOpcode {
        match self {
            AttendanceRequest::Mark(_) => AttendanceOpcode::Mark,
            AttendanceRequest::Close => AttendanceOpcode::Close,
            AttendanceRequest::Auth { .. } => AttendanceOpcode::Auth,
        }
    }
}

/// A reply from the attendance server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceReply {
    Present,
    Absent,
    Late,
    Challenge(u32),
    Deny,
    /// The server's clock reading at the moment authentication succeeded.
    Time(Timestamp),
    /// One stored mark.
    Data(AttendanceMark),
    /// Terminates a sequence of [`AttendanceReply::Data`].
    EndData,
}

impl AttendanceReply {
    pub fn status(&self) -> AttendanceStatus {
        match self {
            AttendanceReply::Present => AttendanceStatus::Present,
            AttendanceReply::Absent => AttendanceStatus::Absent,
            AttendanceReply::Late => AttendanceStatus::Late,
            AttendanceReply::Challenge(_) => AttendanceStatus::Challenge,
            AttendanceReply::Deny => AttendanceStatus::Deny,
            AttendanceReply::Time(_) => AttendanceStatus::Time,
            AttendanceReply::Data(_) => AttendanceStatus::Data,
            AttendanceReply::EndData => AttendanceStatus::EndData,
        }
    }
}

/// Either direction of the attendance protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceMessage {
    Request(AttendanceRequest),
    Reply(AttendanceReply),
}

impl From<AttendanceRequest> for AttendanceMessage {
    fn from(request: AttendanceRequest) -> Self {
        AttendanceMessage::Request(request)
    }
}

impl From<AttendanceReply> for AttendanceMessage {
    fn from(reply: AttendanceReply) -> Self {
        AttendanceMessage::Reply(reply)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a message into its fixed 28-byte wire form.
///
/// Encoding cannot fail: every variant fits the layout.
///
/// # Examples
///
/// ```rust
/// use rollcall_core::protocol::{
///     decode_attendance_reply, encode_attendance, AttendanceMessage, AttendanceReply,
/// };
///
/// let bytes = encode_attendance(&AttendanceMessage::Reply(AttendanceReply::Challenge(7)));
/// assert_eq!(decode_attendance_reply(&bytes).unwrap(), AttendanceReply::Challenge(7));
/// ```
pub fn encode_attendance(msg: &AttendanceMessage) -> [u8; ATTENDANCE_MSG_LEN] {
    let mut buf = [0u8; ATTENDANCE_MSG_LEN];

    let (code, auth, time, id) = match msg {
        AttendanceMessage::Request(req) => {
            let code = req.opcode() as i32;
            match req {
                AttendanceRequest::Mark(m) => (code, 0, m.timestamp, m.id),
                AttendanceRequest::Close => (code, 0, Timestamp::default(), 0),
                AttendanceRequest::Auth { response } => (code, *response, Timestamp::default(), 0),
            }
        }
        AttendanceMessage::Reply(reply) => {
            let code = reply.status() as i32;
            match reply {
                AttendanceReply::Challenge(c) => (code, *c, Timestamp::default(), 0),
                AttendanceReply::Time(t) => (code, 0, *t, 0),
                AttendanceReply::Data(m) => (code, 0, m.timestamp, m.id),
                AttendanceReply::Present
                | AttendanceReply::Absent
                | AttendanceReply::Late
                | AttendanceReply::Deny
                | AttendanceReply::EndData => (code, 0, Timestamp::default(), 0),
            }
        }
    };

    buf[OFF_CODE..OFF_AUTH].copy_from_slice(&code.to_be_bytes());
    buf[OFF_AUTH..OFF_SECS].copy_from_slice(&auth.to_be_bytes());
    buf[OFF_SECS..OFF_MICROS].copy_from_slice(&time.secs.to_be_bytes());
    buf[OFF_MICROS..OFF_ID].copy_from_slice(&time.micros.to_be_bytes());
    buf[OFF_ID..ATTENDANCE_MSG_LEN].copy_from_slice(&id.to_be_bytes());
    buf
}

/// Decodes a message travelling in `direction`.
///
/// # Errors
///
/// See [`decode_attendance_request`] and [`decode_attendance_reply`].
pub fn decode_attendance(bytes: &[u8], direction: Direction) -> Result<AttendanceMessage, ProtocolError> {
    match direction {
        Direction::Request => decode_attendance_request(bytes).map(AttendanceMessage::Request),
        Direction::Reply => decode_attendance_reply(bytes).map(AttendanceMessage::Reply),
    }
}

/// Decodes a client request.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if `bytes` is shorter than 28 bytes.
/// - [`ProtocolError::UnknownOpcode`] for an opcode outside 0..=2.
/// - [`ProtocolError::MalformedPayload`] for a MARK with id 0.
pub fn decode_attendance_request(bytes: &[u8]) -> Result<AttendanceRequest, ProtocolError> {
    require_len(bytes, ATTENDANCE_MSG_LEN)?;
    let opcode = AttendanceOpcode::try_from(read_i32(bytes, OFF_CODE)?)?;
    Ok(match opcode {
        AttendanceOpcode::Mark => AttendanceRequest::Mark(read_mark(bytes, "MARK")?),
        AttendanceOpcode::Close => AttendanceRequest::Close,
        AttendanceOpcode::Auth => AttendanceRequest::Auth {
            response: read_u32(bytes, OFF_AUTH)?,
        },
    })
}

/// Decodes a server reply.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if `bytes` is shorter than 28 bytes.
/// - [`ProtocolError::UnknownStatus`] for a status outside 0..=7.
/// - [`ProtocolError::MalformedPayload`] for a DATA record with id 0.
pub fn decode_attendance_reply(bytes: &[u8]) -> Result<AttendanceReply, ProtocolError> {
    require_len(bytes, ATTENDANCE_MSG_LEN)?;
    let status = AttendanceStatus::try_from(read_i32(bytes, OFF_CODE)?)?;
    Ok(match status {
        AttendanceStatus::Present => AttendanceReply::Present,
        AttendanceStatus::Absent => AttendanceReply::Absent,
        AttendanceStatus::Late => AttendanceReply::Late,
        AttendanceStatus::Challenge => AttendanceReply::Challenge(read_u32(bytes, OFF_AUTH)?),
        AttendanceStatus::Deny => AttendanceReply::Deny,
        AttendanceStatus::Time => AttendanceReply::Time(read_timestamp(bytes)?),
        AttendanceStatus::Data => AttendanceReply::Data(read_mark(bytes, "DATA")?),
        AttendanceStatus::EndData => AttendanceReply::EndData,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn read_timestamp(bytes: &[u8]) -> Result<Timestamp, ProtocolError> {
    Ok(Timestamp::new(read_i64(bytes, OFF_SECS)?, read_i64(bytes, OFF_MICROS)?))
}

fn read_mark(bytes: &[u8], context: &str) -> Result<AttendanceMark, ProtocolError> {
    let id = read_i32(bytes, OFF_ID)?;
    if id == 0 {
        return Err(ProtocolError::MalformedPayload(format!("{context}: id must be non-zero")));
    }
    Ok(AttendanceMark::new(id, read_timestamp(bytes)?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request_bytes(req: AttendanceRequest) -> [u8; ATTENDANCE_MSG_LEN] {
        encode_attendance(&AttendanceMessage::Request(req))
    }

    fn reply_bytes(reply: AttendanceReply) -> [u8; ATTENDANCE_MSG_LEN] {
        encode_attendance(&AttendanceMessage::Reply(reply))
    }

    #[test]
    fn test_mark_request_layout_is_big_endian() {
        // Arrange
        let mark = AttendanceMark::new(42, Timestamp::new(1000, 250));

        // Act
        let bytes = request_bytes(AttendanceRequest::Mark(mark));

        // Assert
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0], "opcode MARK");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0], "unused auth field");
        assert_eq!(&bytes[8..16], &1000i64.to_be_bytes());
        assert_eq!(&bytes[16..24], &250i64.to_be_bytes());
        assert_eq!(&bytes[24..28], &[0, 0, 0, 42]);
    }

    #[test]
    fn test_challenge_reply_carries_value_in_auth_field() {
        let bytes = reply_bytes(AttendanceReply::Challenge(0xDEAD_BEEF));
        assert_eq!(&bytes[0..4], &3i32.to_be_bytes());
        assert_eq!(&bytes[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_decode_mark_request() {
        let mark = AttendanceMark::new(19100009, Timestamp::new(1_700_000_000, 123_456));
        let decoded = decode_attendance_request(&request_bytes(AttendanceRequest::Mark(mark))).unwrap();
        assert_eq!(decoded, AttendanceRequest::Mark(mark));
    }

    #[test]
    fn test_decode_auth_request() {
        let bytes = request_bytes(AttendanceRequest::Auth { response: 0x68C1_0771 });
        assert_eq!(
            decode_attendance_request(&bytes).unwrap(),
            AttendanceRequest::Auth { response: 0x68C1_0771 }
        );
    }

    #[test]
    fn test_decode_data_reply_with_negative_timestamp() {
        let mark = AttendanceMark::new(-7, Timestamp::new(-5, 999_999));
        let decoded = decode_attendance_reply(&reply_bytes(AttendanceReply::Data(mark))).unwrap();
        assert_eq!(decoded, AttendanceReply::Data(mark));
    }

    #[test]
    fn test_unused_fields_are_ignored_on_decode() {
        // A CLOSE with junk in the other fields is still a CLOSE.
        let mut bytes = [0xFFu8; ATTENDANCE_MSG_LEN];
        bytes[0..4].copy_from_slice(&1i32.to_be_bytes());
        assert_eq!(decode_attendance_request(&bytes).unwrap(), AttendanceRequest::Close);
    }

    #[test]
    fn test_unknown_opcode_is_typed_error() {
        let mut bytes = [0u8; ATTENDANCE_MSG_LEN];
        bytes[0..4].copy_from_slice(&9i32.to_be_bytes());
        assert_eq!(decode_attendance_request(&bytes), Err(ProtocolError::UnknownOpcode(9)));
    }

    #[test]
    fn test_unknown_status_is_typed_error() {
        let mut bytes = [0u8; ATTENDANCE_MSG_LEN];
        bytes[0..4].copy_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(decode_attendance_reply(&bytes), Err(ProtocolError::UnknownStatus(-1)));
    }

    #[test]
    fn test_mark_with_zero_id_is_malformed() {
        let bytes = [0u8; ATTENDANCE_MSG_LEN];
        assert!(matches!(
            decode_attendance_request(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_short_buffer_is_insufficient_data() {
        assert_eq!(
            decode_attendance_reply(&[0u8; 27]),
            Err(ProtocolError::InsufficientData {
                needed: ATTENDANCE_MSG_LEN,
                available: 27
            })
        );
    }

    #[test]
    fn test_direction_selects_interpretation() {
        // The same bytes mean MARK as a request and PRESENT as a reply.
        let bytes = request_bytes(AttendanceRequest::Mark(AttendanceMark::new(1, Timestamp::new(0, 0))));
        assert!(matches!(
            decode_attendance(&bytes, Direction::Request),
            Ok(AttendanceMessage::Request(AttendanceRequest::Mark(_)))
        ));
        assert_eq!(
            decode_attendance(&bytes, Direction::Reply),
            Ok(AttendanceMessage::Reply(AttendanceReply::Present))
        );
    }

    #[test]
    fn test_status_display_is_a_sentence() {
        assert!(AttendanceStatus::Absent.to_string().ends_with('.'));
        assert_ne!(AttendanceStatus::Present.to_string(), AttendanceStatus::Deny.to_string());
    }
}
