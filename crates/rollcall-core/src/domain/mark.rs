//! Timestamps and attendance marks.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const MICROS_PER_SEC: i128 = 1_000_000;

/// A point in time as seconds plus microseconds since the Unix epoch.
///
/// This mirrors the two signed 64-bit fields carried on the attendance wire.
/// Values produced by [`Timestamp::from_micros`] are always normalised so that
/// `0 <= micros < 1_000_000`, which keeps the derived ordering meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch.
    pub secs: i64,
    /// Sub-second remainder in microseconds.
    pub micros: i64,
}

impl Timestamp {
    /// Latest normalised timestamp.
    pub const MAX: Self = Self::new(i64::MAX, 999_999);

    /// Earliest normalised timestamp.
    pub const MIN: Self = Self::new(i64::MIN, 0);

    /// Creates a timestamp from its two wire components without normalising.
    pub const fn new(secs: i64, micros: i64) -> Self {
        Self { secs, micros }
    }

    /// Reads the current wall-clock time.
    ///
    /// A clock set before 1970 reads as the epoch rather than panicking.
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self {
                secs: d.as_secs() as i64,
                micros: i64::from(d.subsec_micros()),
            })
            .unwrap_or_default()
    }

    /// Returns the timestamp as a single linear count of microseconds.
    ///
    /// `i128` leaves room for any pair of `i64` components, so malformed
    /// (un-normalised) values received from a peer cannot overflow here.
    pub fn as_micros(&self) -> i128 {
        i128::from(self.secs) * MICROS_PER_SEC + i128::from(self.micros)
    }

    /// Builds a normalised timestamp from a linear microsecond count.
    ///
    /// Negative counts decompose with a non-negative remainder, so
    /// `-1` becomes `(-1 s, 999_999 µs)`.  Counts whose seconds do not fit
    /// an `i64` saturate to [`Timestamp::MAX`] or [`Timestamp::MIN`].
    pub fn from_micros(total: i128) -> Self {
        match i64::try_from(total.div_euclid(MICROS_PER_SEC)) {
            Ok(secs) => Self {
                secs,
                // rem_euclid is in 0..1_000_000.
                micros: total.rem_euclid(MICROS_PER_SEC) as i64,
            },
            Err(_) if total < 0 => Self::MIN,
            Err(_) => Self::MAX,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// One person's presence event.
///
/// The attendance engine guarantees at most one mark per `id` in its store;
/// the store itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttendanceMark {
    /// Roll number of the person marked.  Never zero for an accepted mark.
    pub id: i32,
    /// When the mark was taken, on the marking host's clock.
    pub timestamp: Timestamp,
}

impl AttendanceMark {
    pub const fn new(id: i32, timestamp: Timestamp) -> Self {
        Self { id, timestamp }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
