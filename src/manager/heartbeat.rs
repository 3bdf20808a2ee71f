//! Heartbeat probe payload
//!
//! The monitor sends a small JSON message over the transport's send
//! operation; downstream consumers can recognize it by its `type` field
//! without knowing anything else about the application's wire format. The
//! timing loop itself lives in [`core`](super::core) next to the other
//! background tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker value carried in the probe's `type` field
pub const HEARTBEAT_MESSAGE_TYPE: &str = "heartbeat";

/// Liveness probe payload sent while connected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatProbe {
    #[serde(rename = "type")]
    pub message_type: String,
    /// Unique per probe, so acknowledgments can be correlated by the application
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
}

impl HeartbeatProbe {
    pub fn new() -> Self {
        Self {
            message_type: HEARTBEAT_MESSAGE_TYPE.to_string(),
            id: Uuid::new_v4(),
            sent_at: Utc::now(),
        }
    }

    /// Serialize the probe to its wire payload
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether `payload` is a heartbeat probe produced by this crate
    pub fn is_heartbeat(payload: &str) -> bool {
        serde_json::from_str::<HeartbeatProbe>(payload)
            .map(|probe| probe.message_type == HEARTBEAT_MESSAGE_TYPE)
            .unwrap_or(false)
    }
}

impl Default for HeartbeatProbe {
    fn default() -> Self {
        Self::new()
    }
}
