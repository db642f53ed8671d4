//! # rollcall-core
//!
//! Shared library for Rollcall containing the two binary wire protocols,
//! the record stores both services are built on, the challenge-response
//! authenticator, and the clock-correction routine used when marks are
//! retrieved at close time.
//!
//! This crate is used by the attendance server, the identity server and the
//! client tool.  Apart from the framed transport helpers (which work over any
//! tokio `AsyncRead`/`AsyncWrite`), it has no knowledge of sockets or files.
//!
//! # Architecture overview
//!
//! Rollcall takes attendance over a LAN.  A front-end *marks* people present
//! by sending a small fixed-size message to the attendance server.  At the
//! cutoff time an operator *closes* the server: it proves it knows the shared
//! scrambling function, receives the server's clock reading, and downloads
//! every mark.  A second service maps device addresses to people.
//!
//! - **`protocol`** – How bytes travel over the network.  Both protocols use
//!   fixed-length frames (28 bytes for attendance, 256 bytes for identity) with
//!   big-endian integers, decoded into typed request/reply enums.
//!
//! - **`domain`** – Pure data types: marks, identity records, hardware
//!   addresses, the insertion-ordered `RecordStore`, and `ClockOffset`.
//!
//! - **`auth`** – The challenge generator and the `scramble` function that
//!   gates the close operation.

pub mod auth;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `rollcall_core::AttendanceMark` instead of the full module path.
pub use domain::clock::ClockOffset;
pub use domain::identity::{IdentityRecord, LookupKey, MacAddress, MAX_NAME_LEN};
pub use domain::mark::{AttendanceMark, Timestamp};
pub use domain::record_store::{RecordStore, StoreError};
pub use protocol::attendance::{
    AttendanceMessage, AttendanceOpcode, AttendanceReply, AttendanceRequest, AttendanceStatus,
};
pub use protocol::codec::{Direction, ProtocolError};
pub use protocol::identity::{
    IdentityMessage, IdentityOpcode, IdentityReply, IdentityRequest, IdentityStatus,
};
pub use protocol::transport::TransportError;
