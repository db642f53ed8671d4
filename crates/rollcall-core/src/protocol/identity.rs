//! The identity wire format.
//!
//! Every identity message, in either direction, is exactly 256 bytes:
//!
//! ```text
//! offset  size  field
//!      0     1  opcode (request) or status (reply)   u8
//!      1     4  id                                   i32, big-endian
//!      5     6  hardware address
//!     11   245  name, UTF-8, NUL-terminated, NUL-padded
//! ```
//!
//! The server answers a request by sending the same record back with the
//! leading byte replaced by a status, and for a successful lookup with the
//! fields it did not know filled in.

use std::fmt;

use crate::domain::identity::{is_storable_name, IdentityRecord, LookupKey, MacAddress, MAX_NAME_LEN};
use crate::protocol::codec::{read_i32, read_octets, read_u8, require_len, Direction, ProtocolError};

/// Length in bytes of every identity message.
pub const IDENTITY_MSG_LEN: usize = 256;

const OFF_CODE: usize = 0;
const OFF_ID: usize = 1;
const OFF_ADDRESS: usize = 5;
const OFF_NAME: usize = 11;

// ── Codes ─────────────────────────────────────────────────────────────────────

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdentityOpcode {
    Get = 0,
    Put = 1,
    Commit = 2,
    Exit = 3,
}

impl TryFrom<u8> for IdentityOpcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IdentityOpcode::Get),
            1 => Ok(IdentityOpcode::Put),
            2 => Ok(IdentityOpcode::Commit),
            3 => Ok(IdentityOpcode::Exit),
            other => Err(ProtocolError::UnknownOpcode(i32::from(other))),
        }
    }
}

/// Reply status codes.
///
/// [`IdentityStatus::ConnFailed`] is never sent by the server; clients use
/// it to report that no reply could be obtained at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdentityStatus {
    Success = 0,
    Failed = 1,
    Partial = 2,
    Found = 3,
    NotFound = 4,
    BadQuery = 5,
    ConnFailed = 6,
}

impl TryFrom<u8> for IdentityStatus {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IdentityStatus::Success),
            1 => Ok(IdentityStatus::Failed),
            2 => Ok(IdentityStatus::Partial),
            3 => Ok(IdentityStatus::Found),
            4 => Ok(IdentityStatus::NotFound),
            5 => Ok(IdentityStatus::BadQuery),
            6 => Ok(IdentityStatus::ConnFailed),
            other => Err(ProtocolError::UnknownStatus(i32::from(other))),
        }
    }
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IdentityStatus::Success => "The operation succeeded.",
            IdentityStatus::Failed => "The operation failed.",
            IdentityStatus::Partial => "Some records could not be saved.",
            IdentityStatus::Found => "The record was found.",
            IdentityStatus::NotFound => "No matching record exists.",
            IdentityStatus::BadQuery => "The id or hardware address is already registered.",
            IdentityStatus::ConnFailed => "Could not reach the identity server.",
        };
        f.write_str(text)
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// A request from a client to the identity server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRequest {
    /// Look a record up by id or by address.
    Get(LookupKey),
    /// Stage a new record.
    Put(IdentityRecord),
    /// Persist every staged record.
    Commit,
    /// Stop the server.  No reply is sent.
    Exit,
}

impl IdentityRequest {
    pub fn opcode(&self) -> IdentityOpcode {
        match self {
            IdentityRequest::Get(_) => IdentityOpcode::Get,
            IdentityRequest::Put(_) => IdentityOpcode::Put,
            IdentityRequest::Commit => IdentityOpcode::Commit,
            IdentityRequest::Exit => IdentityOpcode::Exit,
        }
    }
}

/// A reply from the identity server: a status plus the echoed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityReply {
    pub status: IdentityStatus,
    pub record: IdentityRecord,
}

impl IdentityReply {
    pub fn new(status: IdentityStatus, record: IdentityRecord) -> Self {
        Self { status, record }
    }

    /// A reply carrying only a status.
    pub fn status_only(status: IdentityStatus) -> Self {
        Self {
            status,
            record: IdentityRecord::default(),
        }
    }
}

/// Either direction of the identity protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityMessage {
    Request(IdentityRequest),
    Reply(IdentityReply),
}

impl From<IdentityRequest> for IdentityMessage {
    fn from(request: IdentityRequest) -> Self {
        IdentityMessage::Request(request)
    }
}

impl From<IdentityReply> for IdentityMessage {
    fn from(reply: IdentityReply) -> Self {
        IdentityMessage::Reply(reply)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a message into its fixed 256-byte wire form.
///
/// # Errors
///
/// - [`ProtocolError::NameTooLong`] if a record name exceeds
///   [`MAX_NAME_LEN`] bytes.
/// - [`ProtocolError::MalformedPayload`] if a name contains a control
///   character (NUL or a line break among them), or
///   for `Get(LookupKey::Id(0))`, which the wire cannot express.
pub fn encode_identity(msg: &IdentityMessage) -> Result<[u8; IDENTITY_MSG_LEN], ProtocolError> {
    let mut buf = [0u8; IDENTITY_MSG_LEN];

    let code = match msg {
        IdentityMessage::Request(req) => {
            match req {
                IdentityRequest::Get(LookupKey::Id(0)) => {
                    return Err(ProtocolError::MalformedPayload(
                        "GET by id requires a non-zero id".to_string(),
                    ))
                }
                IdentityRequest::Get(LookupKey::Id(id)) => write_fields(&mut buf, *id, MacAddress::default(), "")?,
                IdentityRequest::Get(LookupKey::Address(address)) => write_fields(&mut buf, 0, *address, "")?,
                IdentityRequest::Put(record) => write_record(&mut buf, record)?,
                IdentityRequest::Commit | IdentityRequest::Exit => {}
            }
            req.opcode() as u8
        }
        IdentityMessage::Reply(reply) => {
            write_record(&mut buf, &reply.record)?;
            reply.status as u8
        }
    };

    buf[OFF_CODE] = code;
    Ok(buf)
}

/// Decodes a message travelling in `direction`.
///
/// # Errors
///
/// See [`decode_identity_request`] and [`decode_identity_reply`].
pub fn decode_identity(bytes: &[u8], direction: Direction) -> Result<IdentityMessage, ProtocolError> {
    match direction {
        Direction::Request => decode_identity_request(bytes).map(IdentityMessage::Request),
        Direction::Reply => decode_identity_reply(bytes).map(IdentityMessage::Reply),
    }
}

/// Decodes a client request.
///
/// The name field is only read for PUT.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if `bytes` is shorter than 256 bytes.
/// - [`ProtocolError::UnknownOpcode`] for an opcode outside 0..=3.
/// - [`ProtocolError::NameTooLong`] or [`ProtocolError::MalformedPayload`]
///   for an unusable name in a PUT.
pub fn decode_identity_request(bytes: &[u8]) -> Result<IdentityRequest, ProtocolError> {
    require_len(bytes, IDENTITY_MSG_LEN)?;
    let opcode = IdentityOpcode::try_from(read_u8(bytes, OFF_CODE)?)?;
    Ok(match opcode {
        IdentityOpcode::Get => {
            let id = read_i32(bytes, OFF_ID)?;
            let address = MacAddress::new(read_octets::<6>(bytes, OFF_ADDRESS)?);
            IdentityRequest::Get(LookupKey::from_wire(id, address))
        }
        IdentityOpcode::Put => IdentityRequest::Put(read_record(bytes)?),
        IdentityOpcode::Commit => IdentityRequest::Commit,
        IdentityOpcode::Exit => IdentityRequest::Exit,
    })
}

/// Decodes a server reply.
///
/// # Errors
///
/// - [`ProtocolError::InsufficientData`] if `bytes` is shorter than 256 bytes.
/// - [`ProtocolError::UnknownStatus`] for a status outside 0..=6.
/// - [`ProtocolError::NameTooLong`] or [`ProtocolError::MalformedPayload`]
///   for an unusable name.
pub fn decode_identity_reply(bytes: &[u8]) -> Result<IdentityReply, ProtocolError> {
    require_len(bytes, IDENTITY_MSG_LEN)?;
    let status = IdentityStatus::try_from(read_u8(bytes, OFF_CODE)?)?;
    Ok(IdentityReply {
        status,
        record: read_record(bytes)?,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn write_record(buf: &mut [u8; IDENTITY_MSG_LEN], record: &IdentityRecord) -> Result<(), ProtocolError> {
    write_fields(buf, record.id, record.address, &record.name)
}

fn write_fields(
    buf: &mut [u8; IDENTITY_MSG_LEN],
    id: i32,
    address: MacAddress,
    name: &str,
) -> Result<(), ProtocolError> {
    if name.len() > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if !is_storable_name(name) {
        return Err(ProtocolError::MalformedPayload(
            "name contains a control character".to_string(),
        ));
    }
    let name = name.as_bytes();

    buf[OFF_ID..OFF_ADDRESS].copy_from_slice(&id.to_be_bytes());
    buf[OFF_ADDRESS..OFF_NAME].copy_from_slice(&address.octets());
    buf[OFF_NAME..OFF_NAME + name.len()].copy_from_slice(name);
    Ok(())
}

fn read_record(bytes: &[u8]) -> Result<IdentityRecord, ProtocolError> {
    Ok(IdentityRecord {
        id: read_i32(bytes, OFF_ID)?,
        address: MacAddress::new(read_octets::<6>(bytes, OFF_ADDRESS)?),
        name: read_name(&bytes[OFF_NAME..IDENTITY_MSG_LEN])?,
    })
}

fn read_name(field: &[u8]) -> Result<String, ProtocolError> {
    let len = field
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| ProtocolError::MalformedPayload("name is not NUL-terminated".to_string()))?;
    if len > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    let name = std::str::from_utf8(&field[..len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("name is not valid UTF-8: {e}")))?;
    if !is_storable_name(name) {
        return Err(ProtocolError::MalformedPayload(
            "name contains a control character".to_string(),
        ));
    }
    Ok(name.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: MacAddress = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

    fn encode_request(req: IdentityRequest) -> [u8; IDENTITY_MSG_LEN] {
        encode_identity(&IdentityMessage::Request(req)).unwrap()
    }

    #[test]
    fn test_put_request_layout() {
        // Arrange
        let record = IdentityRecord::new(0x0102_0304, ADDR, "Ada");

        // Act
        let bytes = encode_request(IdentityRequest::Put(record));

        // Assert
        assert_eq!(bytes[0], 1, "opcode PUT");
        assert_eq!(&bytes[1..5], &[1, 2, 3, 4]);
        assert_eq!(&bytes[5..11], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(&bytes[11..14], b"Ada");
        assert!(bytes[14..].iter().all(|b| *b == 0), "name is NUL-padded");
    }

    #[test]
    fn test_get_by_address_encodes_zero_id() {
        let bytes = encode_request(IdentityRequest::Get(LookupKey::Address(ADDR)));
        assert_eq!(&bytes[1..5], &[0, 0, 0, 0]);
        assert_eq!(
            decode_identity_request(&bytes).unwrap(),
            IdentityRequest::Get(LookupKey::Address(ADDR))
        );
    }

    #[test]
    fn test_get_by_id_round_trips() {
        let bytes = encode_request(IdentityRequest::Get(LookupKey::Id(19100009)));
        assert_eq!(
            decode_identity_request(&bytes).unwrap(),
            IdentityRequest::Get(LookupKey::Id(19100009))
        );
    }

    #[test]
    fn test_get_by_zero_id_cannot_be_encoded() {
        let result = encode_identity(&IdentityMessage::Request(IdentityRequest::Get(LookupKey::Id(0))));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_found_reply_round_trips_record() {
        let reply = IdentityReply::new(IdentityStatus::Found, IdentityRecord::new(7, ADDR, "Grace Hopper"));
        let bytes = encode_identity(&IdentityMessage::Reply(reply.clone())).unwrap();
        assert_eq!(decode_identity_reply(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_name_of_max_length_fits() {
        let name = "x".repeat(MAX_NAME_LEN);
        let bytes = encode_request(IdentityRequest::Put(IdentityRecord::new(1, ADDR, name.clone())));
        match decode_identity_request(&bytes).unwrap() {
            IdentityRequest::Put(record) => assert_eq!(record.name, name),
            other => panic!("expected Put, got {other:?}"),
        }
    }

    #[test]
    fn test_overlong_name_is_rejected_on_encode() {
        let record = IdentityRecord::new(1, ADDR, "x".repeat(MAX_NAME_LEN + 1));
        assert_eq!(
            encode_identity(&IdentityMessage::Request(IdentityRequest::Put(record))),
            Err(ProtocolError::NameTooLong {
                len: MAX_NAME_LEN + 1,
                max: MAX_NAME_LEN
            })
        );
    }

    #[test]
    fn test_overlong_name_is_rejected_on_decode() {
        // Arrange: a PUT whose name runs 100 bytes before its terminator.
        let mut bytes = [0u8; IDENTITY_MSG_LEN];
        bytes[0] = IdentityOpcode::Put as u8;
        bytes[OFF_NAME..OFF_NAME + 100].fill(b'n');

        // Act / Assert
        assert_eq!(
            decode_identity_request(&bytes),
            Err(ProtocolError::NameTooLong {
                len: 100,
                max: MAX_NAME_LEN
            })
        );
    }

    #[test]
    fn test_unterminated_name_is_malformed() {
        let mut bytes = [b'n'; IDENTITY_MSG_LEN];
        bytes[0] = IdentityOpcode::Put as u8;
        assert!(matches!(
            decode_identity_request(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_name_is_malformed() {
        let mut bytes = [0u8; IDENTITY_MSG_LEN];
        bytes[0] = IdentityOpcode::Put as u8;
        bytes[OFF_NAME] = 0xFF;
        assert!(matches!(
            decode_identity_request(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_put_with_line_break_in_name_is_malformed() {
        // Arrange: a name that would split one record line into two.
        let mut bytes = [0u8; IDENTITY_MSG_LEN];
        bytes[0] = IdentityOpcode::Put as u8;
        bytes[1..5].copy_from_slice(&7i32.to_be_bytes());
        let name = b"Ada\nLovelace";
        bytes[OFF_NAME..OFF_NAME + name.len()].copy_from_slice(name);

        // Act
        let result = decode_identity_request(&bytes);

        // Assert
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_name_with_line_break_is_rejected_on_encode() {
        let record = IdentityRecord::new(7, MacAddress::new([1, 2, 3, 4, 5, 6]), "Ada\rLovelace");
        let result = encode_identity(&IdentityMessage::Request(IdentityRequest::Put(record)));
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_get_ignores_name_field() {
        let mut bytes = [b'n'; IDENTITY_MSG_LEN];
        bytes[0] = IdentityOpcode::Get as u8;
        bytes[1..5].copy_from_slice(&5i32.to_be_bytes());
        assert_eq!(
            decode_identity_request(&bytes).unwrap(),
            IdentityRequest::Get(LookupKey::Id(5))
        );
    }

    #[test]
    fn test_unknown_opcode_and_status() {
        let mut bytes = [0u8; IDENTITY_MSG_LEN];
        bytes[0] = 4;
        assert_eq!(decode_identity_request(&bytes), Err(ProtocolError::UnknownOpcode(4)));
        bytes[0] = 7;
        assert_eq!(decode_identity_reply(&bytes), Err(ProtocolError::UnknownStatus(7)));
    }

    #[test]
    fn test_commit_and_exit_carry_only_opcode() {
        let commit = encode_request(IdentityRequest::Commit);
        let exit = encode_request(IdentityRequest::Exit);
        assert_eq!(commit[0], 2);
        assert_eq!(exit[0], 3);
        assert!(commit[1..].iter().chain(exit[1..].iter()).all(|b| *b == 0));
    }

    #[test]
    fn test_short_buffer_is_insufficient_data() {
        assert_eq!(
            decode_identity_request(&[0u8; 255]),
            Err(ProtocolError::InsufficientData {
                needed: IDENTITY_MSG_LEN,
                available: 255
            })
        );
    }
}
