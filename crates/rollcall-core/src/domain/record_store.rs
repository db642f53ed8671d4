//! Insertion-ordered record storage shared by both services.
//!
//! A [`RecordStore`] is an append-mostly sequence: the engines only ever
//! insert at the back, and uniqueness is checked by a linear scan before
//! inserting.  That is O(n) per insert, which is fine for a class-sized
//! roster and keeps iteration order equal to insertion order, which the
//! attendance export relies on.
//!
//! # Traversal with a visitor
//!
//! [`RecordStore::foreach`] calls a visitor on every record and returns the
//! sum of what the visitor returned.  Callers use it two ways:
//!
//! - as an "any match" test, with a visitor returning `0` or `1` and checking
//!   the sum for `> 0`;
//! - as a counting reduction, e.g. counting records successfully written.
//!
//! The visitor only receives `&T` and the store is borrowed for the whole
//! traversal, so a visitor cannot re-enter or mutate the store it is walking.

use std::collections::VecDeque;

use thiserror::Error;

/// Error returned when a record cannot be stored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store already holds its configured maximum number of records.
    #[error("record store is full ({capacity} records)")]
    Full { capacity: usize },
}

/// An ordered sequence of records, optionally bounded.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    records: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects into an unbounded store, keeping iteration order.
impl<T> FromIterator<T> for RecordStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
            capacity: None,
        }
    }
}

impl<T> RecordStore<T> {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            capacity: None,
        }
    }

    /// Creates an empty store that refuses inserts beyond `capacity` records.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The configured upper bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn check_room(&self) -> Result<(), StoreError> {
        match self.capacity {
            Some(capacity) if self.records.len() >= capacity => Err(StoreError::Full { capacity }),
            _ => Ok(()),
        }
    }

    /// Inserts `record` at the head.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Full`] if the store is bounded and full.
    pub fn push_front(&mut self, record: T) -> Result<(), StoreError> {
        self.check_room()?;
        self.records.push_front(record);
        Ok(())
    }

    /// Appends `record` at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Full`] if the store is bounded and full.
    pub fn push_back(&mut self, record: T) -> Result<(), StoreError> {
        self.check_room()?;
        self.records.push_back(record);
        Ok(())
    }

    /// Appends `record`.  "Insert" always means append.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Full`] if the store is bounded and full.
    pub fn insert(&mut self, record: T) -> Result<(), StoreError> {
        self.push_back(record)
    }

    /// Removes and returns the head record, or `None` if the store is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        self.records.pop_front()
    }

    pub fn front(&self) -> Option<&T> {
        self.records.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.records.back()
    }

    /// Visits every record in insertion order and returns the sum of the
    /// visitor's return values.
    pub fn foreach<F>(&self, mut visitor: F) -> usize
    where
        F: FnMut(&T) -> usize,
    {
        self.records.iter().map(|record| visitor(record)).sum()
    }

    /// Returns the first record, in insertion order, matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.records.iter().find(|record| predicate(record))
    }

    /// Returns `true` if any record matches `predicate`.
    pub fn contains<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.foreach(|record| usize::from(predicate(record))) > 0
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.records.iter()
    }

    /// Removes every record in insertion order, leaving the store empty but
    /// keeping its capacity bound.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.records.drain(..)
    }

    /// Discards every record without discarding the store.
    pub fn empty(&mut self) {
        self.records.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
