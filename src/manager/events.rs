//! Manager notification surface
//!
//! Notifications are instance-scoped: each manager owns its own broadcast
//! channel and observers register through
//! [`ConnectionManager::subscribe`](super::ConnectionManager::subscribe).
//! Nothing is routed through process-wide statics, so independent managers
//! (and independent tests) cannot observe each other's events.

use super::state::ConnectionState;

/// Observable side effects of the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// The state machine moved to a new state
    StateChanged(ConnectionState),
    /// The reconnection engine is about to run an attempt
    ReconnectAttempt { attempt: u32, max_attempts: u32 },
    /// A reconnection attempt established a connection
    ReconnectSucceeded,
    /// Reconnection ended without a connection; the reason names the cause
    ReconnectFailed { reason: String },
}
