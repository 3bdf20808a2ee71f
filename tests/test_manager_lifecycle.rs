//! Integration tests for the connection manager lifecycle
//!
//! Covers construction, transport binding, connect/disconnect semantics,
//! and idempotent disposal.


use connkeeper::testing::MockTransport;
use connkeeper::{BindError, ConnectionManager, ConnectionState, ManagerEvent};
use manager_test_helpers::{fast_config, next_event};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_fresh_manager_is_disconnected() {
    let manager = ConnectionManager::new(fast_config()).unwrap();

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.is_connected());
    assert_eq!(manager.attempt_count(), 0);
}

#[tokio::test]
async fn test_connect_transitions_through_connecting() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let mut events = manager.subscribe();
    manager.bind_transport(MockTransport::new()).unwrap();

    assert!(manager.connect().await);

    assert_eq!(
        next_event(&mut events, Duration::from_millis(200)).await,
        Some(ManagerEvent::StateChanged(ConnectionState::Connecting))
    );
    assert_eq!(
        next_event(&mut events, Duration::from_millis(200)).await,
        Some(ManagerEvent::StateChanged(ConnectionState::Connected))
    );
    assert!(manager.is_connected());
    assert!(manager.transport_reports_connected());
}

#[tokio::test]
async fn test_double_connect_invokes_transport_once() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let transport = MockTransport::new();
    manager.bind_transport(transport.clone()).unwrap();

    assert!(manager.connect().await);
    assert!(manager.connect().await);

    assert_eq!(transport.connect_calls(), 1);
}

#[tokio::test]
async fn test_failed_connect_returns_false_and_stays_disconnected() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let transport = MockTransport::always_failing();
    manager.bind_transport(transport.clone()).unwrap();

    assert!(!manager.connect().await);

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(transport.connect_calls(), 1);
}

#[tokio::test]
async fn test_connect_without_bound_transport_returns_false() {
    let manager = ConnectionManager::new(fast_config()).unwrap();

    assert!(!manager.connect().await);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_rebinding_transport_is_rejected() {
    let manager = ConnectionManager::new(fast_config()).unwrap();

    manager.bind_transport(MockTransport::new()).unwrap();
    let result = manager.bind_transport(MockTransport::new());

    assert_eq!(result, Err(BindError::AlreadyBound));
}

#[tokio::test]
async fn test_disconnect_tears_down_active_connection() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let transport = MockTransport::new();
    manager.bind_transport(transport.clone()).unwrap();
    assert!(manager.connect().await);

    manager.disconnect().await;

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(transport.disconnect_calls(), 1);
}

#[tokio::test]
async fn test_disconnect_while_not_connected_is_a_noop() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let transport = MockTransport::new();
    manager.bind_transport(transport.clone()).unwrap();

    manager.disconnect().await;

    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    manager.bind_transport(MockTransport::new()).unwrap();
    assert!(manager.connect().await);

    manager.dispose().await;
    manager.dispose().await;
    manager.dispose().await;

    assert!(manager.is_disposed());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_dispose_performs_best_effort_disconnect() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    let transport = MockTransport::new();
    manager.bind_transport(transport.clone()).unwrap();
    assert!(manager.connect().await);

    manager.dispose().await;

    assert_eq!(transport.disconnect_calls(), 1);
}

#[tokio::test]
async fn test_all_operations_after_dispose_are_safe_noops() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    manager.bind_transport(MockTransport::new()).unwrap();
    manager.dispose().await;

    assert!(!manager.connect().await);
    manager.disconnect().await;
    manager.handle_connection_lost().await;
    manager.start_manual_reconnection().await;
    manager.stop_reconnection().await;
    manager.handle_heartbeat_response();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_dispose_wins_race_with_in_flight_connect() {
    let manager = Arc::new(ConnectionManager::new(fast_config()).unwrap());
    let transport = MockTransport::new();
    transport.set_connect_delay(Duration::from_millis(200));
    manager.bind_transport(transport.clone()).unwrap();

    let connector = Arc::clone(&manager);
    let connect_task = tokio::spawn(async move { connector.connect().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.dispose().await;

    // The slow connect resolves after disposal and must not reconnect
    // the manager
    assert!(!connect_task.await.unwrap());
    assert!(manager.is_disposed());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    // The connection the transport just established gets torn down
    assert_eq!(transport.disconnect_calls(), 1);
}

#[tokio::test]
async fn test_binding_after_dispose_is_rejected() {
    let manager = ConnectionManager::new(fast_config()).unwrap();
    manager.dispose().await;

    let result = manager.bind_transport(MockTransport::new());

    assert_eq!(result, Err(BindError::Disposed));
}

#[tokio::test]
async fn test_events_are_instance_scoped() {
    let manager_a = ConnectionManager::new(fast_config()).unwrap();
    let manager_b = ConnectionManager::new(fast_config()).unwrap();
    let mut events_b = manager_b.subscribe();

    manager_a.bind_transport(MockTransport::new()).unwrap();
    assert!(manager_a.connect().await);

    // Activity on manager A must not reach manager B's observers
    assert_eq!(
        next_event(&mut events_b, Duration::from_millis(100)).await,
        None
    );
}
