//! Clock correction for marks retrieved at close time.
//!
//! The host that records marks and the host that closes the session keep
//! independent clocks.  During the close handshake the server sends its own
//! reading in the TIME reply; the closer notes its local clock at the moment
//! that reply arrives.  The difference between the two readings is applied to
//! every mark timestamp received afterwards:
//!
//! ```text
//! corrected = t + (local_reference - server_time)
//! ```
//!
//! The arithmetic is done on a single linear microsecond count and only then
//! split back into seconds and microseconds, so there is no per-component
//! borrow/carry error.
//!
//! # Assumptions
//!
//! The offset between the two clocks is assumed constant between the time a
//! mark was taken and the close.  Network latency between the server taking
//! its reading and the closer receiving it is not compensated; the corrected
//! times are late by that one-way delay.

use super::mark::{AttendanceMark, Timestamp};

/// The offset between the server's clock and the closer's clock, captured
/// once per close handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOffset {
    server_time: Timestamp,
    local_reference: Timestamp,
}

impl ClockOffset {
    /// `server_time` comes from the TIME reply; `local_reference` is the
    /// closer's clock reading taken when that reply was received.
    pub fn new(server_time: Timestamp, local_reference: Timestamp) -> Self {
        Self {
            server_time,
            local_reference,
        }
    }

    pub fn server_time(&self) -> Timestamp {
        self.server_time
    }

    pub fn local_reference(&self) -> Timestamp {
        self.local_reference
    }

    /// Local clock minus server clock, in microseconds.
    pub fn drift_micros(&self) -> i128 {
        self.local_reference.as_micros() - self.server_time.as_micros()
    }

    /// Translates a server-clock timestamp onto the local clock.
    ///
    /// A result beyond the representable range saturates to
    /// [`Timestamp::MAX`] or [`Timestamp::MIN`].
    pub fn correct(&self, t: Timestamp) -> Timestamp {
        Timestamp::from_micros(t.as_micros() + self.drift_micros())
    }

    /// Returns `mark` with its timestamp translated onto the local clock.
    pub fn correct_mark(&self, mark: AttendanceMark) -> AttendanceMark {
        AttendanceMark {
            id: mark.id,
            timestamp: self.correct(mark.timestamp),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
