//! Domain entities for Rollcall.
//!
//! This module contains pure data types with no infrastructure dependencies.
//! Code in outer layers (the protocol engines, the network loops, the file
//! loaders) depends on these types, but the domain never depends on them.

/// Timestamps and attendance marks.
pub mod mark;

/// Identity records, hardware addresses and lookup keys.
pub mod identity;

/// The insertion-ordered sequence both services keep their records in.
pub mod record_store;

/// Reconciles mark timestamps against the closing host's clock.
pub mod clock;
