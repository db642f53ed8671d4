//! Client for the identity server: lookup, registration, commit and exit.

use std::net::SocketAddr;
use std::time::Duration;

use rollcall_core::protocol::transport::{recv_identity_reply, send_identity};
use rollcall_core::{IdentityRecord, IdentityRequest, IdentityStatus, LookupKey};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{connect, ClientError, DEFAULT_IDENTITY_PORT, DEFAULT_IO_TIMEOUT};

/// Where and how to reach the identity server.
#[derive(Debug, Clone)]
pub struct IdentityClientConfig {
    pub server_addr: SocketAddr,
    pub io_timeout: Duration,
}

impl Default for IdentityClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_IDENTITY_PORT)),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Client for the identity server.  Each call opens its own connection.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    config: IdentityClientConfig,
}

impl IdentityClient {
    pub fn new(config: IdentityClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IdentityClientConfig {
        &self.config
    }

    /// Looks a record up by id or by address.
    ///
    /// Returns `Ok(None)` when the server has no match.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnexpectedStatus`] for a status other than FOUND or
    ///   NOT_FOUND.
    /// - Connection and transport failures.
    pub async fn lookup(&self, key: LookupKey) -> Result<Option<IdentityRecord>, ClientError> {
        let mut stream = self.open().await?;
        lookup_over(&mut stream, key, self.config.io_timeout).await
    }

    /// Stages a new record.  SUCCESS, BAD_QUERY and FAILED are all returned
    /// as `Ok`.
    ///
    /// # Errors
    ///
    /// Connection and transport failures, including a name that does not
    /// fit in a message.
    pub async fn put(&self, record: IdentityRecord) -> Result<IdentityStatus, ClientError> {
        let mut stream = self.open().await?;
        status_over(&mut stream, IdentityRequest::Put(record), self.config.io_timeout).await
    }

    /// Asks the server to persist every staged record.  SUCCESS, PARTIAL
    /// and FAILED are all returned as `Ok`.
    ///
    /// # Errors
    ///
    /// Connection and transport failures.
    pub async fn commit(&self) -> Result<IdentityStatus, ClientError> {
        let mut stream = self.open().await?;
        status_over(&mut stream, IdentityRequest::Commit, self.config.io_timeout).await
    }

    /// Tells the server to commit and stop.  The server does not reply.
    ///
    /// # Errors
    ///
    /// Connection and transport failures while sending.
    pub async fn exit(&self) -> Result<(), ClientError> {
        let mut stream = self.open().await?;
        send_identity(&mut stream, IdentityRequest::Exit, self.config.io_timeout).await?;
        debug!(addr = %self.config.server_addr, "exit sent");
        Ok(())
    }

    async fn open(&self) -> Result<tokio::net::TcpStream, ClientError> {
        connect(self.config.server_addr, None, self.config.io_timeout).await
    }
}

// ── Protocol logic ────────────────────────────────────────────────────────────

pub(crate) async fn lookup_over<S>(
    stream: &mut S,
    key: LookupKey,
    io_timeout: Duration,
) -> Result<Option<IdentityRecord>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_identity(stream, IdentityRequest::Get(key), io_timeout).await?;
    let reply = recv_identity_reply(stream, io_timeout).await?;
    match reply.status {
        IdentityStatus::Found => Ok(Some(reply.record)),
        IdentityStatus::NotFound => Ok(None),
        other => Err(ClientError::UnexpectedStatus(other)),
    }
}

pub(crate) async fn status_over<S>(
    stream: &mut S,
    request: IdentityRequest,
    io_timeout: Duration,
) -> Result<IdentityStatus, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_identity(stream, request, io_timeout).await?;
    let reply = recv_identity_reply(stream, io_timeout).await?;
    Ok(reply.status)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::protocol::encode_identity;
    use rollcall_core::{IdentityMessage, IdentityReply, MacAddress};
    use tokio_test::io::Builder;

    const T: Duration = Duration::from_secs(1);
    const ADDR: MacAddress = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

    fn frame(msg: impl Into<IdentityMessage>) -> [u8; 256] {
        encode_identity(&msg.into()).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_found_returns_record() {
        // Arrange
        let record = IdentityRecord::new(19100009, ADDR, "Awais");
        let mut stream = Builder::new()
            .write(&frame(IdentityRequest::Get(LookupKey::Address(ADDR))))
            .read(&frame(IdentityReply::new(IdentityStatus::Found, record.clone())))
            .build();

        // Act
        let found = lookup_over(&mut stream, LookupKey::Address(ADDR), T).await.unwrap();

        // Assert
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_lookup_not_found_returns_none() {
        let mut stream = Builder::new()
            .write(&frame(IdentityRequest::Get(LookupKey::Id(5))))
            .read(&frame(IdentityReply::status_only(IdentityStatus::NotFound)))
            .build();
        assert_eq!(lookup_over(&mut stream, LookupKey::Id(5), T).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_odd_status_is_error() {
        let mut stream = Builder::new()
            .write(&frame(IdentityRequest::Get(LookupKey::Id(5))))
            .read(&frame(IdentityReply::status_only(IdentityStatus::Partial)))
            .build();
        assert!(matches!(
            lookup_over(&mut stream, LookupKey::Id(5), T).await,
            Err(ClientError::UnexpectedStatus(IdentityStatus::Partial))
        ));
    }

    #[tokio::test]
    async fn test_put_returns_server_status() {
        let record = IdentityRecord::new(1, ADDR, "Ada");
        let mut stream = Builder::new()
            .write(&frame(IdentityRequest::Put(record.clone())))
            .read(&frame(IdentityReply::new(IdentityStatus::BadQuery, record.clone())))
            .build();
        assert_eq!(
            status_over(&mut stream, IdentityRequest::Put(record), T).await.unwrap(),
            IdentityStatus::BadQuery
        );
    }

    #[tokio::test]
    async fn test_commit_without_reply_is_transport_error() {
        let mut stream = Builder::new().write(&frame(IdentityRequest::Commit)).build();
        let err = status_over(&mut stream, IdentityRequest::Commit, T).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.is_connection_failure());
    }
}
