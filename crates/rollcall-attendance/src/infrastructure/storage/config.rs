//! TOML configuration for the attendance server.
//!
//! The file is optional.  Every field has a default, so an absent file, an
//! empty file, or a file that only sets a few keys all produce a complete
//! [`AttendanceConfig`].  Example:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 5432
//! io_timeout_secs = 5
//! mark_capacity = 1000
//! local_marks_only = true
//!
//! [identity]
//! addr = "127.0.0.1:2345"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level attendance server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttendanceConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub identity: IdentitySection,
}

/// Listener and session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bound on every framed read and write, in seconds.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    /// Maximum number of distinct marks; further new ids are denied.
    /// Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_capacity: Option<usize>,
    /// Accept MARK only from loopback peers.
    #[serde(default = "default_true")]
    pub local_marks_only: bool,
}

/// Where the identity service lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySection {
    #[serde(default = "default_identity_addr")]
    pub addr: SocketAddr,
}

impl ServerSection {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    5432
}
fn default_io_timeout_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_identity_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 2345))
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            io_timeout_secs: default_io_timeout_secs(),
            mark_capacity: None,
            local_marks_only: default_true(),
        }
    }
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            addr: default_identity_addr(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the configuration at `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AttendanceConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AttendanceConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Renders `config` as TOML, e.g. to print a starting point for a config file.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn render_config(config: &AttendanceConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
