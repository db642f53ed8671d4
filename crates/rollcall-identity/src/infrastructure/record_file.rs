//! The record file: one identity record per line.
//!
//! ```text
//! AA:BB:CC:DD:EE:FF|19100009|Ada Lovelace
//! ```
//!
//! The file is read once at startup and afterwards only appended to.  Blank
//! lines are skipped on load; any other line that does not parse stops the
//! load with an error naming the line.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rollcall_core::domain::identity::RecordLineError;
use rollcall_core::IdentityRecord;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::RecordJournal;

/// Errors from loading the record file.
#[derive(Debug, Error)]
pub enum RecordFileError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: RecordLineError,
    },
}

/// Reads every record in the file at `path`, in file order.
///
/// A missing file is an empty directory, not an error.
///
/// # Errors
///
/// [`RecordFileError::Io`] if the file exists but cannot be read;
/// [`RecordFileError::Malformed`] for the first bad line (1-based).
pub fn load_records(path: &Path) -> Result<Vec<IdentityRecord>, RecordFileError> {
    let io_err = |source| RecordFileError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("{} does not exist yet; starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = IdentityRecord::parse_record_line(&line).map_err(|source| {
            RecordFileError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            }
        })?;
        records.push(record);
    }

    info!(records = records.len(), "loaded {}", path.display());
    Ok(records)
}

/// Append-mode writer for the record file.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordJournal for RecordFile {
    fn begin(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        debug!("opened {} for append", self.path.display());
        Ok(())
    }

    fn append(&mut self, record: &IdentityRecord) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "record file is not open"))?;
        writeln!(writer, "{}", record.to_record_line())
    }

    fn finish(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
