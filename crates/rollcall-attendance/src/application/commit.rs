//! The seam between closing attendance and persisting identity records.
//!
//! When attendance closes for the first time, the server asks the identity
//! service to commit whatever it has staged.  The session handler only sees
//! the [`RecordCommitter`] trait; the TCP implementation lives in
//! `infrastructure::network::identity_committer`.

use async_trait::async_trait;
use rollcall_core::IdentityStatus;
use thiserror::Error;

/// Why a commit did not fully succeed.
#[derive(Debug, Error, PartialEq)]
pub enum CommitError {
    /// The identity service answered with something other than SUCCESS.
    #[error("identity service answered {0:?}")]
    Rejected(IdentityStatus),

    /// No answer was obtained from the identity service.
    #[error("identity service unreachable: {0}")]
    Unreachable(String),
}

/// Asks the identity service to persist its staged records.
///
/// Infrastructure implementations talk TCP; tests use a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordCommitter: Send + Sync {
    async fn commit(&self) -> Result<(), CommitError>;
}
