//! `rollcall`: command-line client for the attendance and identity servers.
//!
//! # Usage
//!
//! ```text
//! rollcall mark <ID>                       mark a person present now
//! rollcall close [--at HH:MM] [--out-dir DIR]
//!                                          close attendance, print and export marks
//! rollcall lookup (--id <ID> | --address <MAC>)
//! rollcall register --id <ID> --address <MAC> --name <NAME>
//! rollcall commit                          persist staged identity records
//! rollcall shutdown-identity               commit and stop the identity server
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Default          | Description                 |
//! |---------------------------|------------------|-----------------------------|
//! | `ROLLCALL_ATTENDANCE_ADDR`| `127.0.0.1:5432` | Attendance server address   |
//! | `ROLLCALL_IDENTITY_ADDR`  | `127.0.0.1:2345` | Identity server address     |
//! | `ROLLCALL_SOURCE_IP`      | (OS chooses)     | Local address to connect from |
//! | `ROLLCALL_IO_TIMEOUT`     | `5`              | Per-transfer timeout (secs) |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveTime};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollcall_client::application::close_attendance::{delay_until_local, parse_closing_time};
use rollcall_client::application::export::{export_marks, format_mark_line};
use rollcall_client::infrastructure::network::{
    AttendanceClient, AttendanceClientConfig, IdentityClient, IdentityClientConfig,
};
use rollcall_core::{IdentityRecord, IdentityStatus, LookupKey, MacAddress};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rollcall client.
#[derive(Debug, Parser)]
#[command(name = "rollcall", about = "Client for the Rollcall attendance and identity servers", version)]
struct Cli {
    /// Attendance server address.
    #[arg(long, global = true, default_value = "127.0.0.1:5432", env = "ROLLCALL_ATTENDANCE_ADDR")]
    attendance_addr: SocketAddr,

    /// Identity server address.
    #[arg(long, global = true, default_value = "127.0.0.1:2345", env = "ROLLCALL_IDENTITY_ADDR")]
    identity_addr: SocketAddr,

    /// Local address to connect to the attendance server from.
    ///
    /// The attendance server only accepts marks from loopback peers unless
    /// configured otherwise.
    #[arg(long, global = true, env = "ROLLCALL_SOURCE_IP")]
    source_ip: Option<IpAddr>,

    /// Timeout in seconds for connecting and for every transfer.
    #[arg(long, global = true, default_value_t = 5, env = "ROLLCALL_IO_TIMEOUT")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mark a person present as of now.
    Mark {
        /// Roll number; must be non-zero.
        id: i32,
    },

    /// Close attendance, print the corrected marks, and write the day's
    /// mark-history file.
    Close {
        /// Wait until this local time today (HH:MM) before closing.
        #[arg(long, value_parser = parse_closing_time)]
        at: Option<NaiveTime>,

        /// Directory the mark-history file is written to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Look an identity record up by id or by hardware address.
    #[command(group(ArgGroup::new("key").required(true).args(["id", "address"])))]
    Lookup {
        #[arg(long)]
        id: Option<i32>,

        #[arg(long)]
        address: Option<MacAddress>,
    },

    /// Stage a new identity record on the identity server.
    Register {
        #[arg(long)]
        id: i32,

        #[arg(long)]
        address: MacAddress,

        #[arg(long)]
        name: String,
    },

    /// Persist every staged identity record.
    Commit,

    /// Commit staged records and stop the identity server.
    ShutdownIdentity,
}

impl Cli {
    fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn attendance_client(&self) -> AttendanceClient {
        AttendanceClient::new(AttendanceClientConfig {
            server_addr: self.attendance_addr,
            local_ip: self.source_ip,
            io_timeout: self.io_timeout(),
        })
    }

    fn identity_client(&self) -> IdentityClient {
        IdentityClient::new(IdentityClientConfig {
            server_addr: self.identity_addr,
            io_timeout: self.io_timeout(),
        })
    }
}

/// Builds the lookup key from the mutually exclusive `--id` / `--address`.
fn lookup_key(id: Option<i32>, address: Option<MacAddress>) -> anyhow::Result<LookupKey> {
    match (id, address) {
        (Some(0), _) => anyhow::bail!("--id must be non-zero; use --address to search by address"),
        (Some(id), _) => Ok(LookupKey::Id(id)),
        (None, Some(address)) => Ok(LookupKey::Address(address)),
        (None, None) => anyhow::bail!("one of --id or --address is required"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Mark { id } => {
            let outcome = cli
                .attendance_client()
                .mark(*id)
                .await
                .with_context(|| format!("marking {id} at {}", cli.attendance_addr))?;
            println!("{outcome}");
        }

        Command::Close { at, out_dir } => {
            if let Some(at) = at {
                let delay = delay_until_local(*at);
                info!("closing at {at} (in {}s)", delay.as_secs());
                tokio::time::sleep(delay).await;
            }

            let transcript = cli
                .attendance_client()
                .close()
                .await
                .with_context(|| format!("closing attendance at {}", cli.attendance_addr))?;
            let marks = transcript.corrected_marks();

            println!("{} mark(s):", marks.len());
            for mark in &marks {
                println!("  {}", format_mark_line(mark, &Local));
            }

            let path = export_marks(out_dir, &marks, Local::now())
                .with_context(|| format!("writing mark history to {}", out_dir.display()))?;
            println!("Written to {}", path.display());
        }

        Command::Lookup { id, address } => {
            let key = lookup_key(*id, *address)?;
            match cli.identity_client().lookup(key).await {
                Ok(Some(record)) => println!("{}", record.to_record_line()),
                Ok(None) => println!("{}", IdentityStatus::NotFound),
                Err(e) => {
                    println!("{}", IdentityStatus::ConnFailed);
                    return Err(e).context(format!("looking up {key}"));
                }
            }
        }

        Command::Register { id, address, name } => {
            let record = IdentityRecord::new(*id, *address, name.clone());
            let status = cli
                .identity_client()
                .put(record)
                .await
                .with_context(|| format!("registering {address} at {}", cli.identity_addr))?;
            println!("{status}");
        }

        Command::Commit => {
            let status = cli
                .identity_client()
                .commit()
                .await
                .with_context(|| format!("committing at {}", cli.identity_addr))?;
            println!("{status}");
        }

        Command::ShutdownIdentity => {
            cli.identity_client()
                .exit()
                .await
                .with_context(|| format!("stopping identity server at {}", cli.identity_addr))?;
            println!("Shutdown requested.");
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
