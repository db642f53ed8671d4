//! Close-time processing: clock correction of downloaded marks and the
//! closing-time schedule.
//!
//! The attendance server stamps nothing itself; every mark carries the time
//! of the host that sent it.  When the list is downloaded it is translated
//! onto the closing host's clock using the offset captured during the
//! handshake (see [`ClockOffset`]).

use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use rollcall_core::{AttendanceMark, ClockOffset, Timestamp};
use thiserror::Error;

/// Everything a successful close handshake yields, before correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseTranscript {
    /// The server's clock reading from the TIME reply.
    pub server_time: Timestamp,
    /// The local clock reading taken as the TIME reply arrived.
    pub local_reference: Timestamp,
    /// Every DATA record, in the order the server sent them.
    pub marks: Vec<AttendanceMark>,
}

impl CloseTranscript {
    /// The offset between the two clocks for this handshake.
    pub fn offset(&self) -> ClockOffset {
        ClockOffset::new(self.server_time, self.local_reference)
    }

    /// The downloaded marks translated onto the local clock, in server order.
    pub fn corrected_marks(&self) -> Vec<AttendanceMark> {
        let offset = self.offset();
        self.marks.iter().map(|m| offset.correct_mark(*m)).collect()
    }
}

/// Error returned for an unusable closing time.
#[derive(Debug, Error, PartialEq)]
#[error("invalid closing time {input:?}: expected HH:MM (24-hour)")]
pub struct ClosingTimeError {
    pub input: String,
}

/// Parses a 24-hour `HH:MM` closing time.
///
/// # Errors
///
/// Returns [`ClosingTimeError`] if `input` is not a valid time of day.
pub fn parse_closing_time(input: &str) -> Result<NaiveTime, ClosingTimeError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| ClosingTimeError {
        input: input.to_string(),
    })
}

/// How long to wait from `now` until `closing` on the same calendar day.
///
/// A closing time that has already passed today yields zero: the close
/// happens immediately rather than tomorrow.
pub fn delay_until<Tz: TimeZone>(closing: NaiveTime, now: &DateTime<Tz>) -> Duration {
    let target = now.date_naive().and_time(closing);
    (target - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

/// [`delay_until`] against the local clock.
pub fn delay_until_local(closing: NaiveTime) -> Duration {
    delay_until(closing, &Local::now())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
