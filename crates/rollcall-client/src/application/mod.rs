//! Application layer use cases for the client tool.
//!
//! - **`close_attendance`** – Turns the raw transcript of a close handshake
//!   into clock-corrected marks, and schedules the close for a wall-clock
//!   time given as `HH:MM`.
//!
//! - **`export`** – Writes the day's mark-history file: one human-readable
//!   line per mark, in local time.

pub mod close_attendance;
pub mod export;
