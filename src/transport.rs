//! Transport provider abstraction
//!
//! The embedding application supplies the actual network transport (sockets,
//! framing, wire protocol) behind a small capability trait. The connection
//! core consumes these four operations and owns no transport logic itself.

use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by an injected transport provider
///
/// The connection core always catches these locally, logs them, and converts
/// them into ordinary failure outcomes; they never escape a public operation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("disconnect failed: {0}")]
    DisconnectFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("transport I/O error")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Capability set injected by the embedding application
///
/// Implementations may suspend for as long as the underlying network
/// operation takes; the connection core bounds connect attempts with its
/// configured timeout and never blocks a public API call on them.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// Attempt to establish the underlying connection
    async fn connect(&self) -> Result<(), TransportError>;

    /// Attempt graceful teardown of the underlying connection
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Attempt to transmit a message payload
    async fn send(&self, payload: &str) -> Result<(), TransportError>;

    /// The transport's own view of connectivity
    ///
    /// Diagnostic only; the manager's state machine is authoritative.
    fn is_connected(&self) -> bool;
}
