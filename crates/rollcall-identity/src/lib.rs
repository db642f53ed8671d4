//! rollcall-identity library crate.
//!
//! The identity server maps device hardware addresses to people.  Records
//! loaded from the record file at startup are *committed*; records added
//! over the network are *pending* until a COMMIT appends them to the file.
//!
//! # Architecture
//!
//! ```text
//! [rollcall-identity]
//!   ├── domain/           IdentityConfig, IdentityDirectory (committed + pending)
//!   ├── application/      IdentityEngine: GET / PUT / COMMIT / EXIT
//!   └── infrastructure/
//!         ├── record_file/ Loading and appending the record file
//!         └── server/      TCP accept loop
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` reaches storage only through the `RecordJournal` trait.
//! - `infrastructure` depends on all other layers plus `tokio`.

/// Domain layer: configuration and the record directory.
pub mod domain;

/// Application layer: request handling.
pub mod application;

/// Infrastructure layer: record file and TCP server.
pub mod infrastructure;
