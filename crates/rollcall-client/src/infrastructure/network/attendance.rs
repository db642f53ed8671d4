//! Client for the attendance server: marking and the close handshake.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rollcall_core::auth::scramble;
use rollcall_core::protocol::transport::{recv_attendance_reply, send_attendance};
use rollcall_core::{AttendanceMark, AttendanceReply, AttendanceRequest, Timestamp};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{connect, ClientError, DEFAULT_ATTENDANCE_PORT, DEFAULT_IO_TIMEOUT};
use crate::application::close_attendance::CloseTranscript;

/// What the server did with a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Present,
    Absent,
    Late,
    Denied,
}

impl fmt::Display for MarkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkOutcome::Present => "The server marked the entry present.",
            MarkOutcome::Absent => "The server marked the entry absent.",
            MarkOutcome::Late => "The server marked the entry late.",
            MarkOutcome::Denied => "The server denied the request.",
        })
    }
}

/// Where and how to reach the attendance server.
#[derive(Debug, Clone)]
pub struct AttendanceClientConfig {
    pub server_addr: SocketAddr,
    /// Local address to connect from; `None` lets the OS choose.
    pub local_ip: Option<IpAddr>,
    pub io_timeout: Duration,
}

impl Default for AttendanceClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_ATTENDANCE_PORT)),
            local_ip: None,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Client for the attendance server.  Each call opens its own connection.
#[derive(Debug, Clone)]
pub struct AttendanceClient {
    config: AttendanceClientConfig,
}

impl AttendanceClient {
    pub fn new(config: AttendanceClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttendanceClientConfig {
        &self.config
    }

    /// Marks `id` present as of now.
    ///
    /// # Errors
    ///
    /// See [`AttendanceClient::mark_at`].
    pub async fn mark(&self, id: i32) -> Result<MarkOutcome, ClientError> {
        self.mark_at(id, Timestamp::now()).await
    }

    /// Marks `id` present as of `at`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ZeroId`] for `id == 0`; nothing is sent.
    /// - [`ClientError::ConnectFailed`] or [`ClientError::Transport`] if the
    ///   exchange fails, including when the server drops a mark from a
    ///   peer it does not accept marks from.
    /// - [`ClientError::UnexpectedReply`] for a reply that is not a mark outcome.
    pub async fn mark_at(&self, id: i32, at: Timestamp) -> Result<MarkOutcome, ClientError> {
        if id == 0 {
            return Err(ClientError::ZeroId);
        }
        let mut stream = self.open().await?;
        mark_over(&mut stream, AttendanceMark::new(id, at), self.config.io_timeout).await
    }

    /// Runs the close handshake and downloads every mark.
    ///
    /// # Errors
    ///
    /// - [`ClientError::AuthDenied`] if the server rejects the response.
    /// - [`ClientError::ConnectFailed`], [`ClientError::Transport`] or
    ///   [`ClientError::UnexpectedReply`] if the exchange breaks down.
    pub async fn close(&self) -> Result<CloseTranscript, ClientError> {
        let mut stream = self.open().await?;
        let transcript = close_over(&mut stream, self.config.io_timeout).await?;
        info!(
            marks = transcript.marks.len(),
            server_time = %transcript.server_time,
            "attendance closed"
        );
        Ok(transcript)
    }

    async fn open(&self) -> Result<tokio::net::TcpStream, ClientError> {
        connect(self.config.server_addr, self.config.local_ip, self.config.io_timeout).await
    }
}

// ── Protocol logic ────────────────────────────────────────────────────────────

pub(crate) async fn mark_over<S>(
    stream: &mut S,
    mark: AttendanceMark,
    io_timeout: Duration,
) -> Result<MarkOutcome, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_attendance(stream, AttendanceRequest::Mark(mark), io_timeout).await?;
    match recv_attendance_reply(stream, io_timeout).await? {
        AttendanceReply::Present => Ok(MarkOutcome::Present),
        AttendanceReply::Absent => Ok(MarkOutcome::Absent),
        AttendanceReply::Late => Ok(MarkOutcome::Late),
        AttendanceReply::Deny => Ok(MarkOutcome::Denied),
        other => Err(ClientError::UnexpectedReply(format!("{other:?} in reply to MARK"))),
    }
}

pub(crate) async fn close_over<S>(stream: &mut S, io_timeout: Duration) -> Result<CloseTranscript, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_attendance(stream, AttendanceRequest::Close, io_timeout).await?;

    let challenge = match recv_attendance_reply(stream, io_timeout).await? {
        AttendanceReply::Challenge(challenge) => challenge,
        other => {
            return Err(ClientError::UnexpectedReply(format!(
                "{other:?} in reply to CLOSE"
            )))
        }
    };
    let response = scramble(challenge);
    debug!("received challenge {challenge:#010x}, answering {response:#010x}");

    send_attendance(stream, AttendanceRequest::Auth { response }, io_timeout).await?;

    let reply = recv_attendance_reply(stream, io_timeout).await?;
    // Read on receipt, before the reply is even inspected.
    let local_reference = Timestamp::now();
    let server_time = match reply {
        AttendanceReply::Time(t) => t,
        AttendanceReply::Deny => return Err(ClientError::AuthDenied),
        other => {
            return Err(ClientError::UnexpectedReply(format!(
                "{other:?} in reply to AUTH"
            )))
        }
    };

    let mut marks = Vec::new();
    loop {
        match recv_attendance_reply(stream, io_timeout).await? {
            AttendanceReply::Data(mark) => marks.push(mark),
            AttendanceReply::EndData => break,
            other => {
                return Err(ClientError::UnexpectedReply(format!(
                    "{other:?} inside the mark list"
                )))
            }
        }
    }

    Ok(CloseTranscript {
        server_time,
        local_reference,
        marks,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
