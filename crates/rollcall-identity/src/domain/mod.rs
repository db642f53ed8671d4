//! Domain layer for rollcall-identity.
//!
//! Pure types with no I/O:
//!
//! - Configuration ([`IdentityConfig`])
//! - The two-partition record directory ([`IdentityDirectory`])

pub mod config;
pub mod directory;

pub use config::IdentityConfig;
pub use directory::{IdentityDirectory, StageError};
