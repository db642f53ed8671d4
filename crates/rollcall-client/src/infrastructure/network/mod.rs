//! Network infrastructure for the client tool.
//!
//! Both Rollcall protocols are one-request-per-connection: a client opens a
//! TCP connection, sends a request, reads the reply (or, for a close, the
//! whole reply sequence) and hangs up.  There is no connection reuse and no
//! reconnect loop.
//!
//! The protocol logic of each client is written against any
//! `AsyncRead + AsyncWrite` stream, so it is unit-tested with scripted
//! `tokio_test` streams; only [`connect`] touches real sockets.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rollcall_core::{IdentityStatus, TransportError};
use thiserror::Error;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time;
use tracing::debug;

pub mod attendance;
pub mod identity;

pub use attendance::{AttendanceClient, AttendanceClientConfig, MarkOutcome};
pub use identity::{IdentityClient, IdentityClientConfig};

/// Default port of the attendance server.
pub const DEFAULT_ATTENDANCE_PORT: u16 = 5432;

/// Default port of the identity server.
pub const DEFAULT_IDENTITY_PORT: u16 = 2345;

/// Default bound on every connect, read and write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection to the server could not be established.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The exchange failed after connecting.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a reply that makes no sense at this point.
    #[error("unexpected reply from server: {0}")]
    UnexpectedReply(String),

    /// The identity server answered with a status the operation never yields.
    #[error("unexpected status from identity server: {0}")]
    UnexpectedStatus(IdentityStatus),

    /// The attendance server rejected the challenge response.
    #[error("authentication failed: the server denied the close")]
    AuthDenied,

    /// A mark was requested for id 0, which is reserved.
    #[error("id must be non-zero")]
    ZeroId,
}

impl ClientError {
    /// Returns `true` if no usable reply was obtained from the server, as
    /// opposed to the server answering with a refusal.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectFailed { .. }
                | ClientError::Transport(_)
                | ClientError::UnexpectedReply(_)
                | ClientError::UnexpectedStatus(_)
        )
    }
}

/// Opens a TCP connection to `addr`, optionally from a specific local
/// address, bounded by `connect_timeout`.
///
/// Binding the local side matters to the attendance server, which only
/// accepts marks from loopback peers: a client on the server host can pick
/// which of its addresses the server sees.
///
/// # Errors
///
/// Returns [`ClientError::ConnectFailed`] if the socket cannot be created,
/// bound, or connected in time.
pub async fn connect(
    addr: SocketAddr,
    local_ip: Option<IpAddr>,
    connect_timeout: Duration,
) -> Result<TcpStream, ClientError> {
    let failed = |source: io::Error| ClientError::ConnectFailed { addr, source };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(failed)?;

    if let Some(ip) = local_ip {
        socket.bind(SocketAddr::new(ip, 0)).map_err(failed)?;
    }

    match time::timeout(connect_timeout, socket.connect(addr)).await {
        Err(_) => Err(failed(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no answer within {connect_timeout:?}"),
        ))),
        Ok(Err(e)) => Err(failed(e)),
        Ok(Ok(stream)) => {
            debug!(%addr, "connected");
            Ok(stream)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
