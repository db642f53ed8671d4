//! Infrastructure layer for rollcall-identity.
//!
//! - **`record_file`** – Loads the record file at startup and appends to it
//!   on commit.
//! - **`server`** – Binds the TCP listener and serves one request per
//!   connection until EXIT or Ctrl-C.

pub mod record_file;
pub mod server;

pub use record_file::{load_records, RecordFile, RecordFileError};
pub use server::{IdentityServer, StopReason};
