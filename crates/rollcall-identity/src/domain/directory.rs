//! The identity directory: committed and pending records.
//!
//! Records live in one of two [`RecordStore`]s:
//!
//! - **committed** – loaded from the record file at startup, plus everything
//!   committed since.
//! - **pending** – added over the network and not yet written to the file.
//!
//! Uniqueness (one record per address, one record per non-zero id) holds
//! across the union of both, and lookups search committed first.

use rollcall_core::{IdentityRecord, LookupKey, RecordStore, StoreError};
use thiserror::Error;

/// Why a record could not be staged.
#[derive(Debug, Error, PartialEq)]
pub enum StageError {
    /// Another record already has this address or non-zero id.
    #[error("a record with this address or id already exists")]
    Conflict,

    /// The pending partition is full.
    #[error(transparent)]
    Full(#[from] StoreError),
}

/// Committed and pending identity records.
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    committed: RecordStore<IdentityRecord>,
    pending: RecordStore<IdentityRecord>,
}

impl IdentityDirectory {
    /// Creates an empty directory with an unbounded pending partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory whose committed partition holds `committed`, in
    /// order, and whose pending partition holds at most `pending_capacity`
    /// records.
    pub fn with_committed(
        committed: impl IntoIterator<Item = IdentityRecord>,
        pending_capacity: Option<usize>,
    ) -> Self {
        Self {
            committed: committed.into_iter().collect(),
            pending: pending_capacity.map_or_else(RecordStore::new, RecordStore::bounded),
        }
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Finds the first record selected by `key`, committed before pending.
    pub fn find(&self, key: LookupKey) -> Option<&IdentityRecord> {
        self.committed
            .find(|r| key.matches(r))
            .or_else(|| self.pending.find(|r| key.matches(r)))
    }

    /// Counts the records that share `record`'s address or non-zero id.
    pub fn conflicts(&self, record: &IdentityRecord) -> usize {
        let clashes = |existing: &IdentityRecord| {
            usize::from(
                existing.address == record.address || (record.id != 0 && existing.id == record.id),
            )
        };
        self.committed.foreach(clashes) + self.pending.foreach(clashes)
    }

    /// Adds `record` to the pending partition.
    ///
    /// # Errors
    ///
    /// [`StageError::Conflict`] if it clashes with any existing record,
    /// [`StageError::Full`] if the pending partition is at capacity.
    pub fn stage(&mut self, record: IdentityRecord) -> Result<(), StageError> {
        if self.conflicts(&record) > 0 {
            return Err(StageError::Conflict);
        }
        self.pending.insert(record)?;
        Ok(())
    }

    /// Pending records in the order they were staged.
    pub fn pending(&self) -> impl Iterator<Item = &IdentityRecord> + '_ {
        self.pending.iter()
    }

    /// Empties the pending partition, returning its records in order.
    pub fn take_pending(&mut self) -> Vec<IdentityRecord> {
        self.pending.drain().collect()
    }

    /// Appends `record` to the committed partition.
    ///
    /// # Errors
    ///
    /// [`StoreError::Full`] if the committed partition is bounded and full.
    pub fn mark_committed(&mut self, record: IdentityRecord) -> Result<(), StoreError> {
        self.committed.push_back(record)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::MacAddress;

    fn addr(last: u8) -> MacAddress {
        MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, last])
    }

    fn directory() -> IdentityDirectory {
        IdentityDirectory::with_committed(
            [
                IdentityRecord::new(1, addr(1), "Ada"),
                IdentityRecord::new(2, addr(2), "Grace"),
            ],
            None,
        )
    }

    #[test]
    fn test_find_by_id_and_by_address_agree() {
        // Arrange
        let dir = directory();

        // Act
        let by_id = dir.find(LookupKey::Id(2));
        let by_address = dir.find(LookupKey::Address(addr(2)));

        // Assert
        assert_eq!(by_id, by_address);
        assert_eq!(by_id.map(|r| r.name.as_str()), Some("Grace"));
    }

    #[test]
    fn test_find_searches_pending_after_committed() {
        let mut dir = directory();
        dir.stage(IdentityRecord::new(3, addr(3), "Linus")).unwrap();

        assert_eq!(dir.find(LookupKey::Id(3)).map(|r| r.id), Some(3));
        assert!(dir.find(LookupKey::Id(4)).is_none());
    }

    #[test]
    fn test_zero_id_record_is_found_only_by_address() {
        let mut dir = IdentityDirectory::new();
        dir.stage(IdentityRecord::new(0, addr(9), "Anon")).unwrap();

        assert!(dir.find(LookupKey::Address(addr(9))).is_some());
        assert_eq!(dir.find(LookupKey::Id(1)), None);
    }

    #[test]
    fn test_stage_rejects_duplicate_address_across_partitions() {
        // Arrange
        let mut dir = directory();

        // Act
        let committed_clash = dir.stage(IdentityRecord::new(10, addr(1), "Copy"));
        dir.stage(IdentityRecord::new(11, addr(11), "New")).unwrap();
        let pending_clash = dir.stage(IdentityRecord::new(12, addr(11), "Again"));

        // Assert
        assert_eq!(committed_clash, Err(StageError::Conflict));
        assert_eq!(pending_clash, Err(StageError::Conflict));
        assert_eq!(dir.pending_len(), 1);
    }

    #[test]
    fn test_stage_rejects_duplicate_nonzero_id() {
        let mut dir = directory();
        assert_eq!(
            dir.stage(IdentityRecord::new(1, addr(50), "Other")),
            Err(StageError::Conflict)
        );
    }

    #[test]
    fn test_zero_ids_do_not_clash_with_each_other() {
        let mut dir = IdentityDirectory::new();
        dir.stage(IdentityRecord::new(0, addr(1), "A")).unwrap();
        assert!(dir.stage(IdentityRecord::new(0, addr(2), "B")).is_ok());
    }

    #[test]
    fn test_conflicts_counts_every_clash() {
        let dir = directory();
        // Same id as Ada, same address as Grace.
        assert_eq!(dir.conflicts(&IdentityRecord::new(1, addr(2), "X")), 2);
    }

    #[test]
    fn test_full_pending_partition_is_reported() {
        let mut dir = IdentityDirectory::with_committed([], Some(1));
        dir.stage(IdentityRecord::new(1, addr(1), "A")).unwrap();

        let result = dir.stage(IdentityRecord::new(2, addr(2), "B"));

        assert!(matches!(result, Err(StageError::Full(_))));
    }

    #[test]
    fn test_take_pending_then_mark_committed() {
        // Arrange
        let mut dir = directory();
        dir.stage(IdentityRecord::new(3, addr(3), "C")).unwrap();
        dir.stage(IdentityRecord::new(4, addr(4), "D")).unwrap();

        // Act
        let taken = dir.take_pending();
        for record in taken.iter().cloned() {
            dir.mark_committed(record).unwrap();
        }

        // Assert
        assert_eq!(taken.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(dir.pending_len(), 0);
        assert_eq!(dir.committed_len(), 4);
        assert!(dir.find(LookupKey::Id(4)).is_some());
    }
}
