//! AttendanceEngine: the mark / close / authenticate state machine.
//!
//! The engine owns the server's mark store and decides every reply.  It does
//! no I/O: the session handler in `infrastructure::network::session` reads
//! requests off the wire, calls into the engine, and writes back whatever it
//! is told to.
//!
//! # States (for beginners)
//!
//! ```text
//!            close            auth ok + marks sent
//!   Open  ──────────►  Closing  ──────────────────►  Closed
//!     ▲                   │
//!     └───────────────────┘
//!      bad response / transport failure
//! ```
//!
//! - `Open`: marks for new ids are stored.
//! - `Closing`: a challenge has been issued and the server is waiting for the
//!   matching response on the same connection.
//! - `Closed`: terminal.  New ids are answered ABSENT; a repeated close still
//!   re-sends the stored marks.
//!
//! An id that is already stored is answered PRESENT in every state, and its
//! first-seen timestamp is kept.

use rollcall_core::auth::{generate_challenge, verify_response};
use rollcall_core::{AttendanceMark, AttendanceReply, RecordStore};
use tracing::{debug, info, warn};

/// Lifecycle state of an [`AttendanceEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Accepting marks.
    Open,
    /// Challenge issued; waiting for the response.
    Closing,
    /// Marks retrieved; no new ids accepted.
    Closed,
}

/// Attendance state machine over a bounded store of marks.
#[derive(Debug)]
pub struct AttendanceEngine {
    marks: RecordStore<AttendanceMark>,
    state: EngineState,
    /// The challenge of the handshake in progress, if any.
    challenge: Option<u32>,
}

impl Default for AttendanceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceEngine {
    /// Creates an open engine with an unbounded mark store.
    pub fn new() -> Self {
        Self {
            marks: RecordStore::new(),
            state: EngineState::Open,
            challenge: None,
        }
    }

    /// Creates an open engine that stores at most `capacity` marks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            marks: RecordStore::bounded(capacity),
            ..Self::new()
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Stored marks in the order they were first seen.
    pub fn marks(&self) -> &RecordStore<AttendanceMark> {
        &self.marks
    }

    /// Handles a MARK request and returns the reply to send.
    ///
    /// Returns [`AttendanceReply::Present`], [`AttendanceReply::Absent`] once
    /// the engine has left `Open`, or [`AttendanceReply::Deny`] when the store
    /// is full.
    pub fn mark(&mut self, mark: AttendanceMark) -> AttendanceReply {
        if self.marks.contains(|m| m.id == mark.id) {
            debug!(id = mark.id, "already marked");
            return AttendanceReply::Present;
        }

        if self.state != EngineState::Open {
            debug!(id = mark.id, state = ?self.state, "mark after close");
            return AttendanceReply::Absent;
        }

        match self.marks.insert(mark) {
            Ok(()) => {
                debug!(id = mark.id, at = %mark.timestamp, "marked present");
                AttendanceReply::Present
            }
            Err(e) => {
                warn!(id = mark.id, "mark refused: {e}");
                AttendanceReply::Deny
            }
        }
    }

    /// Starts the close handshake with a fresh random challenge.
    pub fn begin_close(&mut self) -> u32 {
        self.begin_close_with(generate_challenge())
    }

    /// Starts the close handshake with the given challenge.
    ///
    /// `Open` moves to `Closing`; a `Closed` engine stays closed so the marks
    /// can be retrieved again.
    pub fn begin_close_with(&mut self, challenge: u32) -> u32 {
        if self.state == EngineState::Open {
            self.state = EngineState::Closing;
        }
        self.challenge = Some(challenge);
        debug!(state = ?self.state, "challenge {challenge:#010x} issued");
        challenge
    }

    /// Checks the response to the outstanding challenge.
    ///
    /// The challenge is consumed either way.  A wrong response, or a response
    /// with no challenge outstanding, returns `false` and reopens a `Closing`
    /// engine.
    pub fn authenticate(&mut self, response: u32) -> bool {
        let accepted = self
            .challenge
            .take()
            .is_some_and(|challenge| verify_response(challenge, response));

        if !accepted {
            warn!("close refused: bad challenge response {response:#010x}");
            self.reopen();
        }
        accepted
    }

    /// Abandons the handshake in progress, reopening a `Closing` engine.
    pub fn abort_close(&mut self) {
        self.challenge = None;
        self.reopen();
    }

    /// Records that the marks have been delivered.
    ///
    /// Returns `true` only on the transition from `Closing` to `Closed`, so the
    /// caller commits identity records exactly once.
    pub fn complete_close(&mut self) -> bool {
        if self.state == EngineState::Closing {
            self.state = EngineState::Closed;
            info!(marks = self.marks.len(), "attendance closed");
            true
        } else {
            false
        }
    }

    fn reopen(&mut self) {
        if self.state == EngineState::Closing {
            self.state = EngineState::Open;
            info!("close abandoned; attendance open again");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
