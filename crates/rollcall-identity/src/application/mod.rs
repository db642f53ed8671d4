//! Application layer for rollcall-identity.
//!
//! - Request handling for GET / PUT / COMMIT / EXIT ([`IdentityEngine`])
//! - The storage seam commits write through ([`RecordJournal`])
//!
//! Opening sockets and files happens in the infrastructure layer.

pub mod engine;

pub use engine::{Dispatch, IdentityEngine, RecordJournal};
