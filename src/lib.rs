//! connkeeper - Connection Lifecycle Management
//!
//! A library for managing the lifecycle of a persistent, reconnecting network
//! connection: state tracking, automatic reconnection with a configurable
//! backoff schedule, heartbeat-based detection of silent connection loss, and
//! safe idempotent teardown.
//!
//! # Overview
//!
//! This crate provides:
//! - An immutable, eagerly validated [`ConnectionConfig`]
//! - A [`TransportProvider`] capability trait the embedding application
//!   implements (connect/disconnect/send/is_connected); the core owns no
//!   transport logic itself
//! - A [`ConnectionManager`] facade composing the state machine, the
//!   cancellable reconnection engine, and the heartbeat monitor
//! - Instance-scoped [`ManagerEvent`] notifications for state changes and
//!   reconnection progress
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use connkeeper::{ConnectionConfig, ConnectionManager, ManagerEvent};
//! use connkeeper::testing::MockTransport;
//!
//! # tokio_test::block_on(async {
//! let mut config = ConnectionConfig::new("tcp://game.example.net:7777");
//! config.max_reconnect_attempts = 3;
//! config.retry_delays_ms = vec![100, 200, 500];
//!
//! let manager = ConnectionManager::new(config).unwrap();
//! let mut events = manager.subscribe();
//! manager.bind_transport(MockTransport::new()).unwrap();
//!
//! assert!(manager.connect().await);
//!
//! // A transport-level error observed by the application feeds recovery
//! manager.handle_connection_lost().await;
//! while let Ok(event) = events.recv().await {
//!     if matches!(event, ManagerEvent::ReconnectSucceeded) {
//!         break;
//!     }
//! }
//!
//! manager.dispose().await;
//! # });
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod observability;
pub mod testing;
pub mod transport;

pub use config::{ConfigError, ConnectionConfig};
pub use error::BindError;
pub use manager::{
    ConnectionManager, ConnectionState, HeartbeatProbe, ManagerEvent, RetryPolicy, RetryStep,
    HEARTBEAT_MESSAGE_TYPE,
};
pub use transport::{TransportError, TransportProvider};
