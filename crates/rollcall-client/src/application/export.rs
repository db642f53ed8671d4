//! The mark-history export file.
//!
//! After a close the tool writes one file per day, named after the date:
//!
//! ```text
//! 2024_March_01_attendance.txt
//! ```
//!
//! with one line per mark:
//!
//! ```text
//! Student 42 was present at 09:14:03 AM.
//! ```
//!
//! Times are the clock-corrected mark times rendered in the local zone.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use rollcall_core::{AttendanceMark, Timestamp};
use tracing::debug;

/// File name of the export for `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    date.format("%Y_%B_%d_attendance.txt").to_string()
}

/// Renders `timestamp` as a 12-hour wall-clock time in `zone`.
///
/// Timestamps outside the range chrono can represent fall back to the raw
/// `secs.micros` form.
pub fn format_clock_time<Tz>(timestamp: Timestamp, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let nanos = u32::try_from(timestamp.micros.clamp(0, 999_999) * 1_000).unwrap_or(0);
    match zone.timestamp_opt(timestamp.secs, nanos).single() {
        Some(at) => at.format("%I:%M:%S %p").to_string(),
        None => timestamp.to_string(),
    }
}

/// One line of the export, without the trailing newline.
pub fn format_mark_line<Tz>(mark: &AttendanceMark, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Student {} was present at {}.",
        mark.id,
        format_clock_time(mark.timestamp, zone)
    )
}

/// Writes one line per mark to `writer`, returning the number written.
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub fn write_marks<W, Tz>(writer: &mut W, marks: &[AttendanceMark], zone: &Tz) -> io::Result<usize>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    for mark in marks {
        writeln!(writer, "{}", format_mark_line(mark, zone))?;
    }
    writer.flush()?;
    Ok(marks.len())
}

/// Creates (or truncates) today's export file in `dir` and writes `marks`
/// to it in local time.  Returns the path written.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be created or written.
pub fn export_marks(dir: &Path, marks: &[AttendanceMark], today: DateTime<Local>) -> io::Result<PathBuf> {
    let path = dir.join(export_file_name(today.date_naive()));
    let mut writer = BufWriter::new(File::create(&path)?);
    let written = write_marks(&mut writer, marks, &Local)?;
    debug!(path = %path.display(), written, "mark history exported");
    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
