//! Connection state model
//!
//! Pure state definitions and transition logging, separated from the impure
//! task coordination in [`core`](super::core).

use std::fmt;
use tracing::{info, warn};

/// Connection lifecycle state
///
/// Exactly one state is active at any instant. `Disconnected` is both the
/// initial state and the state new connect or reconnect attempts originate
/// from; callers never set a state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No active connection and no attempt in flight
    Disconnected,
    /// A caller-initiated connect attempt is in flight
    Connecting,
    /// Connection established and usable
    Connected,
    /// The reconnection engine is retrying on its backoff schedule
    Reconnecting,
}

impl ConnectionState {
    /// Whether the heartbeat monitor may run in this state
    pub fn allows_heartbeat(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Log a state transition with severity matched to its meaning
pub(crate) fn log_transition(from: ConnectionState, to: ConnectionState) {
    match (from, to) {
        (ConnectionState::Connecting, ConnectionState::Connected) => {
            info!("connection established");
        }
        (ConnectionState::Reconnecting, ConnectionState::Connected) => {
            info!("reconnection successful");
        }
        (ConnectionState::Connected, ConnectionState::Disconnected) => {
            warn!("connection lost");
        }
        (ConnectionState::Reconnecting, ConnectionState::Disconnected) => {
            warn!("reconnection ended without a connection");
        }
        _ => {
            info!(%from, %to, "connection state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_heartbeat_allowed_only_while_connected() {
        assert!(ConnectionState::Connected.allows_heartbeat());
        assert!(!ConnectionState::Disconnected.allows_heartbeat());
        assert!(!ConnectionState::Connecting.allows_heartbeat());
        assert!(!ConnectionState::Reconnecting.allows_heartbeat());
    }

    #[test]
    fn test_state_equality() {
        assert_eq!(ConnectionState::Connected, ConnectionState::Connected);
        assert_ne!(ConnectionState::Connected, ConnectionState::Reconnecting);
    }
}
