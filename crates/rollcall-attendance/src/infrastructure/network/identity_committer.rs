//! [`RecordCommitter`] backed by the identity service over TCP.

use async_trait::async_trait;
use rollcall_client::infrastructure::network::IdentityClient;
use rollcall_core::IdentityStatus;

use crate::application::commit::{CommitError, RecordCommitter};

/// Sends COMMIT to the identity service through an [`IdentityClient`].
#[derive(Debug, Clone)]
pub struct IdentityCommitter {
    client: IdentityClient,
}

impl IdentityCommitter {
    pub fn new(client: IdentityClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordCommitter for IdentityCommitter {
    async fn commit(&self) -> Result<(), CommitError> {
        match self.client.commit().await {
            Ok(IdentityStatus::Success) => Ok(()),
            Ok(status) => Err(CommitError::Rejected(status)),
            Err(e) => Err(CommitError::Unreachable(e.to_string())),
        }
    }
}
