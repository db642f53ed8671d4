//! IdentityEngine: answers GET, PUT, COMMIT and EXIT.
//!
//! The engine owns the [`IdentityDirectory`] and writes committed records
//! through a [`RecordJournal`].  It never touches sockets; the server loop
//! decodes a request, calls [`IdentityEngine::handle`], and sends back the
//! reply it is given.
//!
//! # Commit semantics
//!
//! | Situation                        | Status    | Pending afterwards |
//! |----------------------------------|-----------|--------------------|
//! | nothing pending                  | SUCCESS   | empty (file untouched) |
//! | journal cannot be opened         | FAILED    | kept               |
//! | every record written             | SUCCESS   | empty              |
//! | some record failed to write      | PARTIAL   | empty              |
//!
//! Records that fail to write are dropped rather than kept for a retry.

use std::io;

use rollcall_core::domain::identity::is_storable_name;
use rollcall_core::{IdentityRecord, IdentityReply, IdentityRequest, IdentityStatus, LookupKey};
use tracing::{debug, info, warn};

use crate::domain::{IdentityDirectory, StageError};

/// Append-only storage for committed records.
///
/// A commit is `begin`, then `append` once per record, then `finish`.
/// The infrastructure implementation is the record file.
#[cfg_attr(test, mockall::automock)]
pub trait RecordJournal: Send {
    /// Opens the journal for appending.
    fn begin(&mut self) -> io::Result<()>;

    /// Appends one record.
    fn append(&mut self, record: &IdentityRecord) -> io::Result<()>;

    /// Flushes and closes what `begin` opened.
    fn finish(&mut self) -> io::Result<()>;
}

/// What the server should do after a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this reply and keep serving.
    Reply(IdentityReply),
    /// Send nothing and stop.  Pending records have been committed.
    Exit(IdentityStatus),
}

/// Identity request handler.
pub struct IdentityEngine<J> {
    directory: IdentityDirectory,
    journal: J,
}

impl<J: RecordJournal> IdentityEngine<J> {
    pub fn new(directory: IdentityDirectory, journal: J) -> Self {
        Self { directory, journal }
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    /// Dispatches one decoded request.
    pub fn handle(&mut self, request: IdentityRequest) -> Dispatch {
        match request {
            IdentityRequest::Get(key) => Dispatch::Reply(self.get(key)),
            IdentityRequest::Put(record) => Dispatch::Reply(self.put(record)),
            IdentityRequest::Commit => Dispatch::Reply(IdentityReply::status_only(self.commit())),
            IdentityRequest::Exit => Dispatch::Exit(self.commit()),
        }
    }

    /// Looks `key` up; FOUND carries the whole record.
    pub fn get(&self, key: LookupKey) -> IdentityReply {
        match self.directory.find(key) {
            Some(record) => {
                debug!(%key, "found");
                IdentityReply::new(IdentityStatus::Found, record.clone())
            }
            None => {
                debug!(%key, "not found");
                IdentityReply::status_only(IdentityStatus::NotFound)
            }
        }
    }

    /// Stages a new record.  The reply echoes the record.
    ///
    /// A name that cannot be written as one record line is a BAD_QUERY.
    pub fn put(&mut self, record: IdentityRecord) -> IdentityReply {
        if !is_storable_name(&record.name) {
            debug!(address = %record.address, "record with control characters in name refused");
            return IdentityReply::new(IdentityStatus::BadQuery, record);
        }
        let status = match self.directory.stage(record.clone()) {
            Ok(()) => {
                info!(address = %record.address, id = record.id, "record staged");
                IdentityStatus::Success
            }
            Err(StageError::Conflict) => {
                debug!(address = %record.address, id = record.id, "duplicate record refused");
                IdentityStatus::BadQuery
            }
            Err(StageError::Full(e)) => {
                warn!(address = %record.address, "record refused: {e}");
                IdentityStatus::Failed
            }
        };
        IdentityReply::new(status, record)
    }

    /// Writes every pending record to the journal and moves the written
    /// ones to the committed partition.
    pub fn commit(&mut self) -> IdentityStatus {
        if self.directory.pending_len() == 0 {
            return IdentityStatus::Success;
        }

        if let Err(e) = self.journal.begin() {
            warn!(pending = self.directory.pending_len(), "cannot open record journal: {e}");
            return IdentityStatus::Failed;
        }

        let mut failed = 0usize;
        for record in self.directory.take_pending() {
            match self.journal.append(&record) {
                Ok(()) => {
                    if let Err(e) = self.directory.mark_committed(record) {
                        warn!("written record not kept in memory: {e}");
                        failed += 1;
                    }
                }
                Err(e) => {
                    warn!(address = %record.address, "record not written, dropped: {e}");
                    failed += 1;
                }
            }
        }

        if let Err(e) = self.journal.finish() {
            warn!("closing record journal failed: {e}");
            failed += 1;
        }

        if failed == 0 {
            info!(committed = self.directory.committed_len(), "pending records committed");
            IdentityStatus::Success
        } else {
            warn!(failed, "commit was partial");
            IdentityStatus::Partial
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
