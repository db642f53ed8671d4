//! TCP accept loop for the attendance server.
//!
//! Connections are served strictly one at a time: a session, including a
//! whole close handshake, finishes before the next connection is accepted.
//! That is what lets the loop own the [`AttendanceEngine`] outright, with no
//! lock around it.
//!
//! `accept()` is polled with a short timeout so the loop notices the shutdown
//! flag even when nobody is connecting.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::session::{handle_session, SessionError};
use crate::application::commit::RecordCommitter;
use crate::application::engine::AttendanceEngine;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Per-connection behaviour of the server.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Bound on every framed read and write.
    pub io_timeout: Duration,
    /// Only loopback peers may send MARK.
    pub local_marks_only: bool,
}

/// A bound attendance server that has not started serving yet.
pub struct AttendanceServer {
    listener: TcpListener,
    engine: AttendanceEngine,
    committer: Arc<dyn RecordCommitter>,
    settings: SessionSettings,
}

impl AttendanceServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns the bind error, e.g. when the port is taken.
    pub async fn bind(
        addr: SocketAddr,
        engine: AttendanceEngine,
        committer: Arc<dyn RecordCommitter>,
        settings: SessionSettings,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            engine,
            committer,
            settings,
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `running` is cleared, then returns the
    /// engine so the caller can inspect its final state.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> AttendanceEngine {
        if let Ok(addr) = self.listener.local_addr() {
            info!("attendance server listening on {addr}");
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((mut stream, peer))) => self.serve(&mut stream, peer).await,
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }

        self.engine
    }

    async fn serve(&mut self, stream: &mut TcpStream, peer: SocketAddr) {
        let trusted = !self.settings.local_marks_only || is_loopback(peer.ip());
        debug!(%peer, trusted, "connection accepted");

        let result = handle_session(
            stream,
            &mut self.engine,
            self.committer.as_ref(),
            trusted,
            self.settings.io_timeout,
        )
        .await;

        match result {
            Ok(outcome) => debug!(%peer, ?outcome, "session finished"),
            Err(SessionError::UntrustedMark) => warn!(%peer, "dropped mark from non-local peer"),
            Err(e) => warn!(%peer, "session aborted: {e}"),
        }
    }
}

/// Loopback check that also accepts IPv4-mapped IPv6 loopback addresses.
fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or(v6.is_loopback(), |v4| v4.is_loopback()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_is_loopback_accepts_both_families() {
        assert!(is_loopback(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(is_loopback(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_loopback(IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped())));
    }

    #[test]
    fn test_is_loopback_rejects_lan_addresses() {
        assert!(!is_loopback(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))));
        assert!(!is_loopback(IpAddr::V6(
            Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped()
        )));
    }
}
