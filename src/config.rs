//! Connection configuration model
//!
//! An immutable, eagerly validated bundle of connection parameters. Invalid
//! values fail at construction/loading time rather than surfacing later as
//! runtime misbehavior.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Connection parameters consumed by [`crate::ConnectionManager`]
///
/// All durations are expressed in milliseconds so the struct stays plainly
/// serializable; use the accessor methods to obtain [`Duration`] values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server address the transport provider should dial (opaque to this crate)
    pub server_address: String,
    /// Upper bound for a single transport connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum automatic reconnection attempts per session (0 disables auto-reconnect)
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Backoff schedule; the last entry repeats once the schedule is exhausted
    #[serde(default)]
    pub retry_delays_ms: Vec<u64>,
    /// Whether the heartbeat monitor runs while connected
    #[serde(default)]
    pub heartbeat_enabled: bool,
    /// Interval between liveness probes
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Deadline for an acknowledgment before the connection is declared lost
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    90_000
}

/// Configuration validation and loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConnectionConfig {
    /// Create a configuration for `server_address` with conservative defaults
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_reconnect_attempts: 5,
            retry_delays_ms: vec![1000, 2000, 5000],
            heartbeat_enabled: false,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }

    /// Load and validate a configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConnectionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all field constraints
    ///
    /// `heartbeat_timeout_ms <= heartbeat_interval_ms` is tolerated but logged,
    /// since a timeout shorter than one probe interval can never be met.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_address.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "server_address must not be empty".to_string(),
            ));
        }

        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_reconnect_attempts > 0 {
            if self.retry_delays_ms.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "retry_delays_ms must not be empty when max_reconnect_attempts > 0"
                        .to_string(),
                ));
            }
            if self.retry_delays_ms.contains(&0) {
                return Err(ConfigError::InvalidConfig(
                    "retry_delays_ms entries must be greater than 0".to_string(),
                ));
            }
        }

        if self.heartbeat_enabled {
            if self.heartbeat_interval_ms == 0 {
                return Err(ConfigError::InvalidConfig(
                    "heartbeat_interval_ms must be greater than 0 when heartbeat is enabled"
                        .to_string(),
                ));
            }
            if self.heartbeat_timeout_ms == 0 {
                return Err(ConfigError::InvalidConfig(
                    "heartbeat_timeout_ms must be greater than 0 when heartbeat is enabled"
                        .to_string(),
                ));
            }
            if self.heartbeat_timeout_ms <= self.heartbeat_interval_ms {
                warn!(
                    interval_ms = self.heartbeat_interval_ms,
                    timeout_ms = self.heartbeat_timeout_ms,
                    "heartbeat_timeout_ms should exceed heartbeat_interval_ms"
                );
            }
        }

        Ok(())
    }

    /// Upper bound for a single transport connect attempt
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Interval between liveness probes
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Deadline for a heartbeat acknowledgment
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_config() -> ConnectionConfig {
        ConnectionConfig::new("tcp://localhost:9000")
    }

    #[test]
    fn test_default_constructor_is_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_server_address_rejected() {
        let mut config = valid_config();
        config.server_address = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_connect_timeout_rejected() {
        let mut config = valid_config();
        config.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_retry_delays_rejected_when_reconnect_enabled() {
        let mut config = valid_config();
        config.max_reconnect_attempts = 3;
        config.retry_delays_ms = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_retry_delays_allowed_when_reconnect_disabled() {
        let mut config = valid_config();
        config.max_reconnect_attempts = 0;
        config.retry_delays_ms = vec![];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_retry_delay_entry_rejected() {
        let mut config = valid_config();
        config.retry_delays_ms = vec![100, 0, 500];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heartbeat_fields_validated_only_when_enabled() {
        let mut config = valid_config();
        config.heartbeat_enabled = false;
        config.heartbeat_interval_ms = 0;
        config.heartbeat_timeout_ms = 0;
        assert!(config.validate().is_ok());

        config.heartbeat_enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_not_exceeding_interval_is_only_a_warning() {
        let mut config = valid_config();
        config.heartbeat_enabled = true;
        config.heartbeat_interval_ms = 200;
        config.heartbeat_timeout_ms = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_with_defaults() {
        let toml_content = r#"
server_address = "tcp://example.net:7777"
max_reconnect_attempts = 4
retry_delays_ms = [100, 250, 500]
heartbeat_enabled = true
heartbeat_interval_ms = 100
heartbeat_timeout_ms = 300
"#;
        let config = ConnectionConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server_address, "tcp://example.net:7777");
        assert_eq!(config.connect_timeout_ms, 5000); // serde default
        assert_eq!(config.retry_delays_ms, vec![100, 250, 500]);
        assert_eq!(config.heartbeat_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = ConnectionConfig::from_toml_str("server_address = ");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_toml_with_invalid_values_rejected() {
        let toml_content = r#"
server_address = ""
"#;
        let result = ConnectionConfig::from_toml_str(toml_content);
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    proptest! {
        #[test]
        fn prop_nonempty_schedules_always_validate(
            address in "[a-z]{1,16}",
            timeout_ms in 1u64..60_000,
            max_attempts in 1u32..100,
            delays in proptest::collection::vec(1u64..10_000, 1..8),
        ) {
            let config = ConnectionConfig {
                server_address: address,
                connect_timeout_ms: timeout_ms,
                max_reconnect_attempts: max_attempts,
                retry_delays_ms: delays,
                heartbeat_enabled: false,
                heartbeat_interval_ms: 0,
                heartbeat_timeout_ms: 0,
            };
            prop_assert!(config.validate().is_ok());
        }
    }
}
