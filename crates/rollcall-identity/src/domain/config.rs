//! Identity server configuration.
//!
//! [`IdentityConfig`] is the single source of truth for runtime settings.
//! `main.rs` fills it from command-line arguments and environment
//! variables; tests build it directly.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default name of the record file, relative to the working directory.
pub const DEFAULT_RECORD_FILE: &str = "student_records.db";

/// All runtime configuration for the identity server.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Address and port the server listens on.
    pub bind_addr: SocketAddr,

    /// Record file: loaded at startup, appended to on commit.
    pub record_file: PathBuf,

    /// Bound on every framed read and write.
    pub io_timeout: Duration,

    /// Maximum number of pending (uncommitted) records.  `None` means
    /// unbounded.
    pub pending_capacity: Option<usize>,
}

impl Default for IdentityConfig {
    /// | Field            | Default              |
    /// |------------------|----------------------|
    /// | bind_addr        | `0.0.0.0:2345`       |
    /// | record_file      | `student_records.db` |
    /// | io_timeout       | 5 seconds            |
    /// | pending_capacity | unbounded            |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 2345)),
            record_file: PathBuf::from(DEFAULT_RECORD_FILE),
            io_timeout: Duration::from_secs(5),
            pending_capacity: None,
        }
    }
}
