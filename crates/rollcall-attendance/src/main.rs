//! Rollcall attendance server entry point.
//!
//! Loads the TOML configuration, applies command-line overrides, binds the
//! listener and serves until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! attendance-server [--config attendance.toml] [--bind 0.0.0.0] [--port 5432]
//! attendance-server --print-config
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollcall_attendance::application::engine::AttendanceEngine;
use rollcall_attendance::infrastructure::network::identity_committer::IdentityCommitter;
use rollcall_attendance::infrastructure::network::server::{AttendanceServer, SessionSettings};
use rollcall_attendance::infrastructure::storage::config::{
    load_config, render_config, AttendanceConfig,
};
use rollcall_client::infrastructure::network::{IdentityClient, IdentityClientConfig};

/// Rollcall attendance server.
#[derive(Debug, Parser)]
#[command(name = "attendance-server", about = "Rollcall attendance server", version)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "attendance.toml", env = "ROLLCALL_ATTENDANCE_CONFIG")]
    config: PathBuf,

    /// Override `server.bind`.
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Override `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn into_attendance_config(self) -> anyhow::Result<AttendanceConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let print_only = cli.print_config;
    let config = cli.into_attendance_config()?;

    if print_only {
        print!("{}", render_config(&config)?);
        return Ok(());
    }

    info!("Rollcall attendance server starting");

    let engine = match config.server.mark_capacity {
        Some(capacity) => AttendanceEngine::with_capacity(capacity),
        None => AttendanceEngine::new(),
    };
    let committer = IdentityCommitter::new(IdentityClient::new(IdentityClientConfig {
        server_addr: config.identity.addr,
        io_timeout: config.server.io_timeout(),
    }));
    let settings = SessionSettings {
        io_timeout: config.server.io_timeout(),
        local_marks_only: config.server.local_marks_only,
    };

    let listen_addr = config.server.listen_addr();
    let server = AttendanceServer::bind(listen_addr, engine, Arc::new(committer), settings)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    let engine = server.run(running).await;

    info!(
        state = ?engine.state(),
        marks = engine.marks().len(),
        "Rollcall attendance server stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["attendance-server"]);
        assert_eq!(cli.config, PathBuf::from("attendance.toml"));
        assert!(cli.bind.is_none());
        assert!(cli.port.is_none());
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_overrides_apply_over_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.toml");
        std::fs::write(&path, "[server]\nport = 7000\nlocal_marks_only = false\n").unwrap();
        let path_arg = path.to_string_lossy().into_owned();
        let cli = Cli::parse_from([
            "attendance-server",
            "--config",
            path_arg.as_str(),
            "--port",
            "7100",
            "--bind",
            "127.0.0.1",
        ]);

        // Act
        let config = cli.into_attendance_config().unwrap();

        // Assert
        assert_eq!(config.server.listen_addr().to_string(), "127.0.0.1:7100");
        assert!(!config.server.local_marks_only);
    }

    #[test]
    fn test_cli_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path_arg = dir.path().join("absent.toml").to_string_lossy().into_owned();
        let cli = Cli::parse_from(["attendance-server", "--config", path_arg.as_str()]);

        let config = cli.into_attendance_config().unwrap();

        assert_eq!(config, AttendanceConfig::default());
    }

    #[test]
    fn test_cli_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["attendance-server", "--port", "70000"]).is_err());
    }
}
