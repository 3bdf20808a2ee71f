//! Error types for connection lifecycle operations
//!
//! Only construction-time and binding-time failures surface as hard errors.
//! Runtime transport failures, heartbeat timeouts, and retry exhaustion are
//! absorbed internally and reported through return values and
//! [`ManagerEvent`](crate::manager::ManagerEvent) notifications.

use thiserror::Error;

/// Transport binding failures
///
/// The transport capability set must be bound exactly once per manager
/// instance, before any connect attempt and before disposal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("transport provider already bound")]
    AlreadyBound,

    #[error("manager has been disposed")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        assert_eq!(
            BindError::AlreadyBound.to_string(),
            "transport provider already bound"
        );
        assert_eq!(
            BindError::Disposed.to_string(),
            "manager has been disposed"
        );
    }
}
