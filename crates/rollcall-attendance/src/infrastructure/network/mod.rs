//! Network infrastructure for the attendance server.
//!
//! # Sub-modules
//!
//! - **`session`** – Serves a single connection: one MARK, or the whole
//!   CLOSE / CHALLENGE / AUTH / TIME / DATA* / END_DATA exchange.
//!
//! - **`server`** – Binds the TCP listener and serves connections one at a
//!   time until the shutdown flag is cleared.
//!
//! - **`identity_committer`** – Asks the identity service to commit staged
//!   records when attendance closes.

pub mod identity_committer;
pub mod server;
pub mod session;
