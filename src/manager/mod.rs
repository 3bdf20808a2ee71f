//! Connection lifecycle management
//!
//! The subsystem is split into focused sub-modules that separate pure
//! decision logic from I/O and task coordination:
//!
//! - [`state`] - connection state model and transition logging
//! - [`events`] - instance-scoped notification surface
//! - [`retry`] - pure reconnection decisions (backoff schedule, attempt budget)
//! - [`heartbeat`] - liveness probe payload
//! - [`core`] - the [`ConnectionManager`] facade and its background tasks
//!
//! # Usage
//!
//! ```rust,no_run
//! use connkeeper::{ConnectionConfig, ConnectionManager};
//! use connkeeper::testing::MockTransport;
//!
//! # tokio_test::block_on(async {
//! let mut config = ConnectionConfig::new("tcp://localhost:9000");
//! config.heartbeat_enabled = true;
//! config.heartbeat_interval_ms = 5_000;
//! config.heartbeat_timeout_ms = 15_000;
//!
//! let manager = ConnectionManager::new(config).unwrap();
//! manager.bind_transport(MockTransport::new()).unwrap();
//! assert!(manager.connect().await);
//! manager.dispose().await;
//! # });
//! ```

pub mod core;
pub mod events;
pub mod heartbeat;
pub mod retry;
pub mod state;

pub use self::core::ConnectionManager;
pub use events::ManagerEvent;
pub use heartbeat::{HeartbeatProbe, HEARTBEAT_MESSAGE_TYPE};
pub use retry::{RetryPolicy, RetryStep};
pub use state::ConnectionState;
