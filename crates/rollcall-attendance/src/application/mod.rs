//! Application layer of the attendance server.
//!
//! Nothing in here touches sockets or files:
//!
//! - **`engine`** – The mark / close / authenticate state machine and the
//!   store of marks it owns.
//! - **`commit`** – The [`commit::RecordCommitter`] trait the server calls
//!   once attendance closes, so staged identity records get persisted.

pub mod commit;
pub mod engine;
