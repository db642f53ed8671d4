//! Rollcall identity server entry point.
//!
//! # Usage
//!
//! ```text
//! identity-server [OPTIONS]
//!
//! Options:
//!   --bind <IP>                 Address to listen on [default: 0.0.0.0]
//!   --port <PORT>               Port to listen on [default: 2345]
//!   --record-file <PATH>        Record file [default: student_records.db]
//!   --io-timeout <SECS>         Per-transfer timeout [default: 5]
//!   --pending-capacity <N>      Maximum uncommitted records [default: unbounded]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                    | Default              |
//! |-----------------------------|----------------------|
//! | `ROLLCALL_IDENTITY_BIND`    | `0.0.0.0`            |
//! | `ROLLCALL_IDENTITY_PORT`    | `2345`               |
//! | `ROLLCALL_RECORD_FILE`      | `student_records.db` |
//! | `ROLLCALL_IO_TIMEOUT`       | `5`                  |
//! | `ROLLCALL_PENDING_CAPACITY` | (unbounded)          |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollcall_identity::application::IdentityEngine;
use rollcall_identity::domain::{IdentityConfig, IdentityDirectory};
use rollcall_identity::infrastructure::{load_records, IdentityServer, RecordFile};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rollcall identity server.
#[derive(Debug, Parser)]
#[command(name = "identity-server", about = "Rollcall identity record server", version)]
struct Cli {
    /// IP address to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "ROLLCALL_IDENTITY_BIND")]
    bind: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 2345, env = "ROLLCALL_IDENTITY_PORT")]
    port: u16,

    /// Record file, loaded at startup and appended to on commit.
    #[arg(long, default_value = "student_records.db", env = "ROLLCALL_RECORD_FILE")]
    record_file: PathBuf,

    /// Timeout in seconds for every framed read and write.
    #[arg(long, default_value_t = 5, env = "ROLLCALL_IO_TIMEOUT")]
    io_timeout: u64,

    /// Maximum number of uncommitted records.
    #[arg(long, env = "ROLLCALL_PENDING_CAPACITY")]
    pending_capacity: Option<usize>,
}

impl Cli {
    /// Converts the parsed CLI arguments into an [`IdentityConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_identity_config(self) -> anyhow::Result<IdentityConfig> {
        let bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(IdentityConfig {
            bind_addr,
            record_file: self.record_file,
            io_timeout: Duration::from_secs(self.io_timeout),
            pending_capacity: self.pending_capacity,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_identity_config()?;

    info!(
        "Rollcall identity server starting: bind={}, records={}",
        config.bind_addr,
        config.record_file.display()
    );

    let committed = load_records(&config.record_file)
        .with_context(|| format!("loading {}", config.record_file.display()))?;
    let directory = IdentityDirectory::with_committed(committed, config.pending_capacity);
    let engine = IdentityEngine::new(directory, RecordFile::new(&config.record_file));

    let server = IdentityServer::bind(config.bind_addr, engine, config.io_timeout)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let (reason, engine) = server.run(running).await;

    info!(
        ?reason,
        committed = engine.directory().committed_len(),
        "Rollcall identity server stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["identity-server"]);

        // Assert
        assert_eq!(cli.bind, "0.0.0.0");
        assert_eq!(cli.port, 2345);
        assert_eq!(cli.record_file, PathBuf::from("student_records.db"));
        assert_eq!(cli.io_timeout, 5);
        assert_eq!(cli.pending_capacity, None);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "identity-server",
            "--port",
            "9000",
            "--record-file",
            "/var/lib/rollcall/records.db",
            "--pending-capacity",
            "50",
        ]);
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.record_file, PathBuf::from("/var/lib/rollcall/records.db"));
        assert_eq!(cli.pending_capacity, Some(50));
    }

    #[test]
    fn test_into_identity_config_defaults_match_domain_defaults() {
        let config = Cli::parse_from(["identity-server"]).into_identity_config().unwrap();
        let expected = IdentityConfig::default();

        assert_eq!(config.bind_addr, expected.bind_addr);
        assert_eq!(config.record_file, expected.record_file);
        assert_eq!(config.io_timeout, expected.io_timeout);
        assert_eq!(config.pending_capacity, expected.pending_capacity);
    }

    #[test]
    fn test_into_identity_config_custom_bind() {
        let cli = Cli::parse_from(["identity-server", "--bind", "127.0.0.1", "--port", "2400"]);
        let config = cli.into_identity_config().unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:2400");
    }

    #[test]
    fn test_into_identity_config_invalid_bind_returns_error() {
        // Arrange
        let cli = Cli {
            bind: "not.an.ip".to_string(),
            port: 2345,
            record_file: PathBuf::from("records.db"),
            io_timeout: 5,
            pending_capacity: None,
        };

        // Act
        let result = cli.into_identity_config();

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }
}
