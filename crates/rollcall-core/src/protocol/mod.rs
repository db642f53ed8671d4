//! Protocol module containing the two wire formats and framed transport.
//!
//! Both protocols use fixed-length messages with no header or length
//! prefix: each side always reads exactly [`ATTENDANCE_MSG_LEN`] or
//! [`IDENTITY_MSG_LEN`] bytes.

pub mod attendance;
pub mod codec;
pub mod identity;
pub mod transport;

pub use attendance::{
    decode_attendance, decode_attendance_reply, decode_attendance_request, encode_attendance,
    AttendanceMessage, AttendanceOpcode, AttendanceReply, AttendanceRequest, AttendanceStatus,
    ATTENDANCE_MSG_LEN,
};
pub use codec::{Direction, ProtocolError};
pub use identity::{
    decode_identity, decode_identity_reply, decode_identity_request, encode_identity,
    IdentityMessage, IdentityOpcode, IdentityReply, IdentityRequest, IdentityStatus,
    IDENTITY_MSG_LEN,
};
pub use transport::TransportError;
