//! Per-connection handling for the attendance protocol.
//!
//! Each connection carries exactly one request, except for a close, which
//! continues on the same connection:
//!
//! ```text
//! client                         server
//!   │ ── MARK(id, t) ──────────────► │   PRESENT | ABSENT | DENY
//!   │ ◄──────────────── reply ────── │
//!
//!   │ ── CLOSE ────────────────────► │
//!   │ ◄──────── CHALLENGE(c) ─────── │
//!   │ ── AUTH(scramble(c)) ────────► │   wrong response → DENY, done
//!   │ ◄──────── TIME(now) ────────── │
//!   │ ◄──────── DATA(mark) ───────── │   once per stored mark
//!   │ ◄──────── END_DATA ─────────── │
//! ```
//!
//! A request the server cannot make sense of ends the connection with no
//! reply.  If anything goes wrong between CHALLENGE and END_DATA, the engine
//! is put back to `Open` so the close can be retried.

use std::time::Duration;

use rollcall_core::protocol::transport::{recv_attendance_request, send_attendance};
use rollcall_core::{AttendanceReply, AttendanceRequest, AttendanceStatus, Timestamp, TransportError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::application::commit::RecordCommitter;
use crate::application::engine::AttendanceEngine;

/// Errors that end a session without a clean reply sequence.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The stream failed, timed out, or carried an undecodable frame.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A well-formed request arrived where it is not allowed.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A MARK arrived from a peer that may not mark.
    #[error("mark refused from untrusted peer")]
    UntrustedMark,
}

/// What a completed session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A mark was answered with this status.
    Marked(AttendanceStatus),
    /// A close was refused because of a wrong challenge response.
    Denied,
    /// A close was authenticated and `marks` marks were sent.
    /// `first_close` is `true` when this session closed attendance.
    Retrieved { marks: usize, first_close: bool },
}

/// Serves one connection against `engine`.
///
/// `peer_trusted` gates MARK requests: an untrusted peer's mark is dropped
/// without a reply.  On the first successful close `committer` is asked to
/// persist identity records; its failure is logged and otherwise ignored.
///
/// # Errors
///
/// Returns [`SessionError`] when the connection must be dropped.  The engine
/// is never left in `Closing` on return.
pub async fn handle_session<S>(
    stream: &mut S,
    engine: &mut AttendanceEngine,
    committer: &dyn RecordCommitter,
    peer_trusted: bool,
    io_timeout: Duration,
) -> Result<SessionOutcome, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match recv_attendance_request(stream, io_timeout).await? {
        AttendanceRequest::Mark(mark) => {
            if !peer_trusted {
                return Err(SessionError::UntrustedMark);
            }
            let reply = engine.mark(mark);
            send_attendance(stream, reply, io_timeout).await?;
            Ok(SessionOutcome::Marked(reply.status()))
        }

        AttendanceRequest::Close => {
            let challenge = engine.begin_close();
            match close_handshake(stream, engine, challenge, io_timeout).await {
                Ok(Some(marks)) => {
                    let first_close = engine.complete_close();
                    if first_close {
                        commit_identities(committer).await;
                    }
                    Ok(SessionOutcome::Retrieved { marks, first_close })
                }
                Ok(None) => Ok(SessionOutcome::Denied),
                Err(e) => {
                    engine.abort_close();
                    Err(e)
                }
            }
        }

        AttendanceRequest::Auth { .. } => Err(SessionError::ProtocolViolation(
            "AUTH without a preceding CLOSE".to_string(),
        )),
    }
}

/// Runs CHALLENGE → AUTH → TIME → DATA* → END_DATA.
///
/// Returns `Ok(None)` when the response was wrong and DENY was sent, or the
/// number of marks sent.
async fn close_handshake<S>(
    stream: &mut S,
    engine: &mut AttendanceEngine,
    challenge: u32,
    io_timeout: Duration,
) -> Result<Option<usize>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_attendance(stream, AttendanceReply::Challenge(challenge), io_timeout).await?;

    let response = match recv_attendance_request(stream, io_timeout).await? {
        AttendanceRequest::Auth { response } => response,
        other => {
            return Err(SessionError::ProtocolViolation(format!(
                "expected AUTH after CHALLENGE, got {:?}",
                other.opcode()
            )))
        }
    };

    if !engine.authenticate(response) {
        send_attendance(stream, AttendanceReply::Deny, io_timeout).await?;
        return Ok(None);
    }

    let now = Timestamp::now();
    send_attendance(stream, AttendanceReply::Time(now), io_timeout).await?;
    debug!(server_time = %now, "time sent");

    let mut sent = 0;
    for mark in engine.marks().iter() {
        send_attendance(stream, AttendanceReply::Data(*mark), io_timeout).await?;
        sent += 1;
    }
    send_attendance(stream, AttendanceReply::EndData, io_timeout).await?;

    info!(marks = sent, "marks delivered");
    Ok(Some(sent))
}

async fn commit_identities(committer: &dyn RecordCommitter) {
    match committer.commit().await {
        Ok(()) => info!("identity records committed"),
        Err(e) => warn!("identity commit after close failed: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commit::{CommitError, MockRecordCommitter};
    use crate::application::engine::EngineState;
    use rollcall_core::auth::scramble;
    use rollcall_core::protocol::transport::recv_attendance_reply;
    use rollcall_core::protocol::encode_attendance;
    use rollcall_core::{AttendanceMark, AttendanceMessage, IdentityStatus};
    use tokio_test::io::Builder;

    const T: Duration = Duration::from_secs(1);

    fn frame(msg: impl Into<AttendanceMessage>) -> [u8; 28] {
        encode_attendance(&msg.into())
    }

    fn mark(id: i32, secs: i64) -> AttendanceMark {
        AttendanceMark::new(id, Timestamp::new(secs, 0))
    }

    fn no_commit() -> MockRecordCommitter {
        let mut committer = MockRecordCommitter::new();
        committer.expect_commit().never();
        committer
    }

    /// Runs the server side of a close on one end of a duplex pipe while
    /// `client` drives the other end.
    async fn with_close_client<F, Fut, R>(
        engine: &mut AttendanceEngine,
        committer: &MockRecordCommitter,
        client: F,
    ) -> (Result<SessionOutcome, SessionError>, R)
    where
        F: FnOnce(tokio::io::DuplexStream) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let (client_end, mut server_end) = tokio::io::duplex(4096);
        tokio::join!(
            handle_session(&mut server_end, engine, committer, true, T),
            client(client_end)
        )
    }

    // ── MARK ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_mark_from_trusted_peer_is_answered() {
        // Arrange
        let mut engine = AttendanceEngine::new();
        let mut stream = Builder::new()
            .read(&frame(AttendanceRequest::Mark(mark(42, 1000))))
            .write(&frame(AttendanceReply::Present))
            .build();

        // Act
        let outcome = handle_session(&mut stream, &mut engine, &no_commit(), true, T)
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, SessionOutcome::Marked(AttendanceStatus::Present));
        assert_eq!(engine.marks().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_from_untrusted_peer_is_dropped() {
        let mut engine = AttendanceEngine::new();
        let mut stream = Builder::new()
            .read(&frame(AttendanceRequest::Mark(mark(42, 1000))))
            .build();

        let result = handle_session(&mut stream, &mut engine, &no_commit(), false, T).await;

        assert!(matches!(result, Err(SessionError::UntrustedMark)));
        assert!(engine.marks().is_empty());
    }

    #[tokio::test]
    async fn test_bare_auth_is_protocol_violation() {
        let mut engine = AttendanceEngine::new();
        let mut stream = Builder::new()
            .read(&frame(AttendanceRequest::Auth { response: 1 }))
            .build();

        let result = handle_session(&mut stream, &mut engine, &no_commit(), true, T).await;

        assert!(matches!(result, Err(SessionError::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn test_garbage_frame_is_transport_error() {
        let mut engine = AttendanceEngine::new();
        let mut bad = [0u8; 28];
        bad[3] = 9;
        let mut stream = Builder::new().read(&bad).build();

        let err = handle_session(&mut stream, &mut engine, &no_commit(), true, T)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Transport(ref t) if t.is_protocol_violation()));
    }

    // ── CLOSE ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_close_streams_marks_then_commits_once() {
        // Arrange
        let mut engine = AttendanceEngine::new();
        engine.mark(mark(3, 100));
        engine.mark(mark(1, 200));
        let mut committer = MockRecordCommitter::new();
        committer.expect_commit().times(1).returning(|| Ok(()));

        // Act
        let (outcome, replies) = with_close_client(&mut engine, &committer, |mut s| async move {
            send_attendance(&mut s, AttendanceRequest::Close, T).await.unwrap();
            let AttendanceReply::Challenge(c) = recv_attendance_reply(&mut s, T).await.unwrap()
            else {
                panic!("expected CHALLENGE");
            };
            send_attendance(&mut s, AttendanceRequest::Auth { response: scramble(c) }, T)
                .await
                .unwrap();
            let mut replies = Vec::new();
            loop {
                let reply = recv_attendance_reply(&mut s, T).await.unwrap();
                replies.push(reply);
                if reply == AttendanceReply::EndData {
                    break replies;
                }
            }
        })
        .await;

        // Assert
        assert_eq!(
            outcome.unwrap(),
            SessionOutcome::Retrieved { marks: 2, first_close: true }
        );
        assert!(matches!(replies[0], AttendanceReply::Time(_)));
        assert_eq!(
            &replies[1..],
            &[
                AttendanceReply::Data(mark(3, 100)),
                AttendanceReply::Data(mark(1, 200)),
                AttendanceReply::EndData,
            ]
        );
        assert_eq!(engine.state(), EngineState::Closed);
    }

    #[tokio::test]
    async fn test_commit_failure_does_not_undo_close() {
        // Arrange
        let mut engine = AttendanceEngine::new();
        let mut committer = MockRecordCommitter::new();
        committer
            .expect_commit()
            .times(1)
            .returning(|| Err(CommitError::Rejected(IdentityStatus::Partial)));

        // Act
        let (outcome, ()) = with_close_client(&mut engine, &committer, |mut s| async move {
            send_attendance(&mut s, AttendanceRequest::Close, T).await.unwrap();
            let AttendanceReply::Challenge(c) = recv_attendance_reply(&mut s, T).await.unwrap()
            else {
                panic!("expected CHALLENGE");
            };
            send_attendance(&mut s, AttendanceRequest::Auth { response: scramble(c) }, T)
                .await
                .unwrap();
            while recv_attendance_reply(&mut s, T).await.unwrap() != AttendanceReply::EndData {}
        })
        .await;

        // Assert
        assert!(outcome.is_ok());
        assert_eq!(engine.state(), EngineState::Closed);
    }

    #[tokio::test]
    async fn test_wrong_response_is_denied_and_engine_reopens() {
        // Arrange
        let mut engine = AttendanceEngine::new();

        // Act
        let (outcome, reply) = with_close_client(&mut engine, &no_commit(), |mut s| async move {
            send_attendance(&mut s, AttendanceRequest::Close, T).await.unwrap();
            let AttendanceReply::Challenge(c) = recv_attendance_reply(&mut s, T).await.unwrap()
            else {
                panic!("expected CHALLENGE");
            };
            send_attendance(&mut s, AttendanceRequest::Auth { response: scramble(c) ^ 0xFF }, T)
                .await
                .unwrap();
            recv_attendance_reply(&mut s, T).await.unwrap()
        })
        .await;

        // Assert
        assert_eq!(outcome.unwrap(), SessionOutcome::Denied);
        assert_eq!(reply, AttendanceReply::Deny);
        assert_eq!(engine.state(), EngineState::Open);
    }

    #[tokio::test]
    async fn test_mark_after_challenge_is_violation_and_reopens() {
        let mut engine = AttendanceEngine::new();

        let (outcome, ()) = with_close_client(&mut engine, &no_commit(), |mut s| async move {
            send_attendance(&mut s, AttendanceRequest::Close, T).await.unwrap();
            recv_attendance_reply(&mut s, T).await.unwrap();
            send_attendance(&mut s, AttendanceRequest::Mark(mark(5, 1)), T)
                .await
                .unwrap();
        })
        .await;

        assert!(matches!(outcome, Err(SessionError::ProtocolViolation(_))));
        assert_eq!(engine.state(), EngineState::Open);
        assert!(engine.marks().is_empty());
    }

    #[tokio::test]
    async fn test_client_hanging_up_mid_handshake_reopens() {
        let mut engine = AttendanceEngine::new();

        let (outcome, ()) = with_close_client(&mut engine, &no_commit(), |mut s| async move {
            send_attendance(&mut s, AttendanceRequest::Close, T).await.unwrap();
            recv_attendance_reply(&mut s, T).await.unwrap();
            drop(s);
        })
        .await;

        assert!(matches!(outcome, Err(SessionError::Transport(TransportError::Closed))));
        assert_eq!(engine.state(), EngineState::Open);
    }
}
