//! rollcall-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`,
//! the attendance server (which commits through [`infrastructure::network::IdentityClient`])
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does rollcall-client do?
//!
//! It speaks both Rollcall protocols from the client side:
//!
//! 1. **Marking** – sends one MARK request stamped with the local time and
//!    reports whether the server recorded the person present.
//! 2. **Closing** – runs the CLOSE → CHALLENGE → AUTH → TIME → DATA… →
//!    END_DATA handshake, corrects every downloaded mark onto the local
//!    clock, and writes the day's mark-history file.
//! 3. **Identity** – looks records up, registers new ones, commits them to
//!    disk, and shuts the identity server down.
//!
//! Every request uses its own TCP connection.

/// Application layer: close-time processing and the mark-history export.
pub mod application;

/// Infrastructure layer: TCP clients for both servers.
pub mod infrastructure;
