//! TCP accept loop for the identity server.
//!
//! One connection carries one request.  Connections are served one at a
//! time, so the loop owns the [`IdentityEngine`] directly.  The loop stops
//! on EXIT or when the shutdown flag is cleared; either way pending records
//! are committed first.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rollcall_core::protocol::transport::{recv_identity_request, send_identity};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::{Dispatch, IdentityEngine, RecordJournal};

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Why [`IdentityServer::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A client sent EXIT.
    ExitRequested,
    /// The shutdown flag was cleared.
    Shutdown,
}

/// A bound identity server that has not started serving yet.
pub struct IdentityServer<J> {
    listener: TcpListener,
    engine: IdentityEngine<J>,
    io_timeout: Duration,
}

impl<J: RecordJournal> IdentityServer<J> {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns the bind error, e.g. when the port is taken.
    pub async fn bind(addr: SocketAddr, engine: IdentityEngine<J>, io_timeout: Duration) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            engine,
            io_timeout,
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until EXIT or shutdown, then returns the engine.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> (StopReason, IdentityEngine<J>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("identity server listening on {addr}");
        }

        let reason = loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; committing pending records");
                let status = self.engine.commit();
                info!("final commit: {status}");
                break StopReason::Shutdown;
            }

            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((mut stream, peer))) => {
                    if self.serve(&mut stream, peer).await {
                        break StopReason::ExitRequested;
                    }
                }
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        };

        (reason, self.engine)
    }

    /// Serves one connection.  Returns `true` if the server should stop.
    async fn serve(&mut self, stream: &mut TcpStream, peer: SocketAddr) -> bool {
        let request = match recv_identity_request(stream, self.io_timeout).await {
            Ok(request) => request,
            Err(e) => {
                warn!(%peer, "dropping connection: {e}");
                return false;
            }
        };
        debug!(%peer, opcode = ?request.opcode(), "request");

        match self.engine.handle(request) {
            Dispatch::Reply(reply) => {
                if let Err(e) = send_identity(stream, reply, self.io_timeout).await {
                    warn!(%peer, "reply not delivered: {e}");
                }
                false
            }
            Dispatch::Exit(status) => {
                info!(%peer, "exit requested; final commit: {status}");
                true
            }
        }
    }
}
