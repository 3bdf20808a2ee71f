//! Connection manager facade and background task coordination
//!
//! This module owns the impure side of the subsystem: the public API, the
//! spawned reconnection and heartbeat tasks, and the shared state they
//! coordinate through. Decision logic stays in the pure sibling modules
//! ([`state`](super::state), [`retry`](super::retry)).
//!
//! Both background tasks are cooperatively cancellable through watch
//! channels and never run concurrently with each other for the same manager:
//! the heartbeat monitor only runs while `Connected`, the reconnection
//! engine only while `Reconnecting`.

use crate::config::{ConfigError, ConnectionConfig};
use crate::error::BindError;
use crate::manager::events::ManagerEvent;
use crate::manager::heartbeat::HeartbeatProbe;
use crate::manager::retry::{RetryPolicy, RetryStep};
use crate::manager::state::{log_transition, ConnectionState};
use crate::transport::TransportProvider;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Facade over the connection state machine, reconnection engine, and
/// heartbeat monitor
///
/// All public operations are safe to call from any task concurrently with
/// the background tasks. After [`dispose`](Self::dispose) every operation
/// becomes a safe no-op returning `false`/`Err` instead of panicking.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    transport: StdMutex<Option<Arc<dyn TransportProvider>>>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ManagerEvent>,
    disposed: AtomicBool,
    auto_reconnect: AtomicBool,
    attempts: AtomicU32,
    last_heartbeat_ack: StdMutex<Instant>,
    tasks: Mutex<TaskSlots>,
}

#[derive(Default)]
struct TaskSlots {
    reconnect: Option<TaskSlot>,
    heartbeat: Option<TaskSlot>,
}

/// Handle to one spawned background task with its cancellation channel
struct TaskSlot {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskSlot {
    /// Request cooperative shutdown; the task exits at its next suspension point
    fn request_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Request shutdown and abort the task immediately
    fn abort(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.abort();
    }
}

fn lock_or_recover<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionManager {
    /// Create a manager for a validated configuration
    ///
    /// Fails eagerly on an invalid configuration; no background work starts
    /// until a connect or reconnect operation is invoked.
    pub fn new(config: ConnectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _events_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport: StdMutex::new(None),
                state_tx,
                events_tx,
                disposed: AtomicBool::new(false),
                auto_reconnect: AtomicBool::new(true),
                attempts: AtomicU32::new(0),
                last_heartbeat_ack: StdMutex::new(Instant::now()),
                tasks: Mutex::new(TaskSlots::default()),
            }),
        })
    }

    /// Bind the transport capability set; allowed exactly once per instance
    pub fn bind_transport(
        &self,
        transport: Arc<dyn TransportProvider>,
    ) -> Result<(), BindError> {
        if self.inner.is_disposed() {
            return Err(BindError::Disposed);
        }
        let mut guard = lock_or_recover(&self.inner.transport);
        if guard.is_some() {
            return Err(BindError::AlreadyBound);
        }
        *guard = Some(transport);
        info!(server = %self.inner.config.server_address, "transport provider bound");
        Ok(())
    }

    /// Attempt to connect; `true` on success or when already connected
    ///
    /// Returns `false` without panicking when no transport is bound, the
    /// manager is disposed, a reconnection session is currently active, or
    /// the transport's connect operation fails or times out.
    pub async fn connect(&self) -> bool {
        Inner::connect(&self.inner).await
    }

    /// Tear down an active connection; safe no-op in every other state
    pub async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    /// Signal that the active connection has died
    ///
    /// Invoked by the heartbeat monitor on timeout or by the embedding
    /// application when it observes a transport-level error. No-op unless
    /// currently `Connected`; starts the reconnection engine when
    /// auto-reconnect is enabled and configured.
    pub async fn handle_connection_lost(&self) {
        Inner::handle_connection_lost(Arc::clone(&self.inner)).await;
    }

    /// Start a reconnection session regardless of current state
    ///
    /// Returns promptly; the session runs as a background task. No-op when
    /// disposed or when a session is already active.
    pub async fn start_manual_reconnection(&self) {
        if self.inner.is_disposed() {
            debug!("manual reconnection ignored on disposed manager");
            return;
        }
        self.inner.auto_reconnect.store(true, Ordering::SeqCst);
        Inner::start_reconnection(&self.inner).await;
    }

    /// Disable auto-reconnect and cancel any active session (best effort)
    pub async fn stop_reconnection(&self) {
        self.inner.auto_reconnect.store(false, Ordering::SeqCst);
        let tasks = self.inner.tasks.lock().await;
        if let Some(slot) = &tasks.reconnect {
            slot.request_stop();
            info!("reconnection stop requested");
        }
    }

    /// Record that a liveness acknowledgment arrived; no-op when not connected
    pub fn handle_heartbeat_response(&self) {
        self.inner.handle_heartbeat_response();
    }

    /// Permanently tear the manager down; idempotent and safe from any state
    pub async fn dispose(&self) {
        self.inner.dispose().await;
    }

    /// Current state of the connection state machine
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Whether the state machine currently reports `Connected`
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Attempts made by the current or most recent reconnection session
    pub fn attempt_count(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Watch channel following every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to this manager's notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.inner.events_tx.subscribe()
    }

    /// The bound transport's own connectivity view (diagnostic only)
    pub fn transport_reports_connected(&self) -> bool {
        self.inner
            .transport()
            .map(|transport| transport.is_connected())
            .unwrap_or(false)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Backstop only: callers should dispose() for graceful teardown.
        // Drop cannot await, so the best-effort disconnect is skipped here.
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Ok(mut tasks) = self.inner.tasks.try_lock() {
            if let Some(slot) = tasks.reconnect.take() {
                slot.abort();
            }
            if let Some(slot) = tasks.heartbeat.take() {
                slot.abort();
            }
        }
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn transport(&self) -> Option<Arc<dyn TransportProvider>> {
        lock_or_recover(&self.transport).clone()
    }

    fn emit(&self, event: ManagerEvent) {
        // Err only means no subscriber is listening right now
        let _ = self.events_tx.send(event);
    }

    /// Unconditional transition with logging and notification
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state_tx.send_replace(next);
        if prev != next {
            log_transition(prev, next);
            self.emit(ManagerEvent::StateChanged(next));
        }
    }

    /// Atomic compare-and-transition; returns whether this caller won
    ///
    /// Concurrent triggers (e.g. two loss signals racing) serialize on the
    /// watch channel's internal lock, so exactly one observer acts.
    fn transition_if(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            log_transition(from, to);
            self.emit(ManagerEvent::StateChanged(to));
        }
        changed
    }

    async fn connect(inner: &Arc<Self>) -> bool {
        if inner.is_disposed() {
            debug!("connect ignored on disposed manager");
            return false;
        }
        if inner.state() == ConnectionState::Connected {
            debug!("connect requested while already connected");
            return true;
        }
        if inner.state() == ConnectionState::Reconnecting {
            // The active session already owns the transport's connect
            // operation; callers wanting a manual attempt stop it first
            debug!("connect declined while a reconnection session is active");
            return false;
        }
        let Some(transport) = inner.transport() else {
            warn!("connect requested before a transport provider was bound");
            return false;
        };

        inner.set_state(ConnectionState::Connecting);
        match inner.try_transport_connect(&transport).await {
            Ok(()) => Self::finish_connect(inner, ConnectionState::Connecting).await,
            Err(reason) => {
                warn!(%reason, "connection attempt failed");
                inner.set_state(ConnectionState::Disconnected);
                false
            }
        }
    }

    /// Run the transport connect operation under the configured timeout,
    /// folding errors and timeouts into one failure reason
    async fn try_transport_connect(
        &self,
        transport: &Arc<dyn TransportProvider>,
    ) -> Result<(), String> {
        let timeout = self.config.connect_timeout();
        match tokio::time::timeout(timeout, transport.connect()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("connect timed out after {timeout:?}")),
        }
    }

    /// Shared success path for caller-initiated connects and the
    /// reconnection engine
    ///
    /// Returns `false` when `dispose()` won the race while the transport
    /// call was still in flight; the freshly established connection is then
    /// torn down instead of resurrecting the disposed manager.
    async fn finish_connect(inner: &Arc<Self>, from: ConnectionState) -> bool {
        let committed =
            !inner.is_disposed() && inner.transition_if(from, ConnectionState::Connected);
        if !committed {
            debug!("connect completed after dispose, tearing down");
            if let Some(transport) = inner.transport() {
                if let Err(e) = transport.disconnect().await {
                    warn!(error = %e, "disconnect after late connect failed");
                }
            }
            return false;
        }
        inner.attempts.store(0, Ordering::SeqCst);
        inner.auto_reconnect.store(true, Ordering::SeqCst);
        if inner.config.heartbeat_enabled {
            Self::start_heartbeat(inner).await;
        }
        true
    }

    async fn disconnect(&self) {
        if self.is_disposed() {
            debug!("disconnect ignored on disposed manager");
            return;
        }
        if self.state() != ConnectionState::Connected {
            debug!(state = %self.state(), "disconnect requested while not connected");
            return;
        }

        self.stop_heartbeat().await;
        if let Some(transport) = self.transport() {
            if let Err(e) = transport.disconnect().await {
                warn!(error = %e, "transport disconnect failed");
            }
        }
        self.transition_if(ConnectionState::Connected, ConnectionState::Disconnected);
    }

    /// Boxed: the loss path re-enters the spawned task graph (heartbeat
    /// monitor -> reconnection engine -> heartbeat monitor), which would
    /// otherwise make the task futures recursively typed.
    fn handle_connection_lost(inner: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if inner.is_disposed() {
                return;
            }
            if !inner.transition_if(ConnectionState::Connected, ConnectionState::Disconnected) {
                debug!(state = %inner.state(), "connection loss signal ignored");
                return;
            }

            inner.stop_heartbeat().await;
            if inner.config.max_reconnect_attempts > 0
                && inner.auto_reconnect.load(Ordering::SeqCst)
            {
                Self::start_reconnection(&inner).await;
            } else {
                info!("auto-reconnect disabled, staying disconnected");
            }
        })
    }

    fn handle_heartbeat_response(&self) {
        if self.is_disposed() || self.state() != ConnectionState::Connected {
            return;
        }
        *lock_or_recover(&self.last_heartbeat_ack) = Instant::now();
        debug!("heartbeat acknowledgment recorded");
    }

    async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!("dispose called on already disposed manager");
            return;
        }
        info!("disposing connection manager");

        let (reconnect, heartbeat) = {
            let mut tasks = self.tasks.lock().await;
            (tasks.reconnect.take(), tasks.heartbeat.take())
        };
        if let Some(slot) = reconnect {
            slot.abort();
        }
        if let Some(slot) = heartbeat {
            slot.abort();
        }

        if self.state() == ConnectionState::Connected {
            if let Some(transport) = self.transport() {
                if let Err(e) = transport.disconnect().await {
                    warn!(error = %e, "best-effort disconnect during dispose failed");
                }
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Start a reconnection session; no-op when one is already active
    async fn start_reconnection(inner: &Arc<Self>) {
        if inner.is_disposed() {
            return;
        }
        let mut tasks = inner.tasks.lock().await;
        if tasks.reconnect.is_some() {
            debug!("reconnection session already active");
            return;
        }

        inner.attempts.store(0, Ordering::SeqCst);
        inner.set_state(ConnectionState::Reconnecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(run_reconnect_loop(task_inner, shutdown_rx));
        tasks.reconnect = Some(TaskSlot {
            shutdown_tx,
            handle,
        });
    }

    /// Release the session slot so a later session can start; called by the
    /// loop itself on every exit path
    async fn release_reconnect_slot(&self) {
        // Dropping our own TaskSlot detaches the already-finishing task
        self.tasks.lock().await.reconnect = None;
    }

    async fn start_heartbeat(inner: &Arc<Self>) {
        if inner.is_disposed() {
            return;
        }
        let mut tasks = inner.tasks.lock().await;
        if let Some(previous) = tasks.heartbeat.take() {
            previous.request_stop();
        }
        // Fresh tracker for the new connected period
        *lock_or_recover(&inner.last_heartbeat_ack) = Instant::now();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(run_heartbeat_loop(task_inner, shutdown_rx));
        tasks.heartbeat = Some(TaskSlot {
            shutdown_tx,
            handle,
        });
    }

    async fn stop_heartbeat(&self) {
        let slot = self.tasks.lock().await.heartbeat.take();
        if let Some(slot) = slot {
            // Cooperative stop; never joined, so the heartbeat task may
            // invoke this on itself without deadlocking
            slot.request_stop();
        }
    }

    async fn send_probe(&self) {
        let Some(transport) = self.transport() else {
            return;
        };
        let probe = HeartbeatProbe::new();
        match probe.to_payload() {
            Ok(payload) => {
                if let Err(e) = transport.send(&payload).await {
                    warn!(error = %e, "failed to send heartbeat probe");
                }
            }
            Err(e) => error!(error = %e, "failed to serialize heartbeat probe"),
        }
    }

    fn heartbeat_ack_overdue(&self) -> bool {
        let last_ack = *lock_or_recover(&self.last_heartbeat_ack);
        last_ack.elapsed() > self.config.heartbeat_timeout()
    }
}

/// Sleep that a shutdown signal can cut short
///
/// Returns `true` when the full delay elapsed, `false` on cancellation.
async fn interruptible_sleep(shutdown_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        changed = shutdown_rx.changed() => {
            match changed {
                Ok(()) => !*shutdown_rx.borrow(),
                Err(_) => false,
            }
        }
        _ = tokio::time::sleep(delay) => true,
    }
}

/// One reconnection session: attempt, delay, retry until success,
/// exhaustion, or cancellation
async fn run_reconnect_loop(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    let policy = RetryPolicy::from_config(&inner.config);
    info!(
        max_attempts = policy.max_attempts(),
        "reconnection engine started"
    );

    loop {
        let cancelled = *shutdown_rx.borrow() || inner.is_disposed();
        let attempts_made = inner.attempts.load(Ordering::SeqCst);
        match policy.next_step(attempts_made, cancelled) {
            RetryStep::Cancelled => {
                info!("reconnection cancelled");
                inner.transition_if(ConnectionState::Reconnecting, ConnectionState::Disconnected);
                break;
            }
            RetryStep::Exhausted => {
                let reason = policy.exhaustion_reason();
                error!(%reason, "giving up on reconnection");
                inner.emit(ManagerEvent::ReconnectFailed { reason });
                inner.transition_if(ConnectionState::Reconnecting, ConnectionState::Disconnected);
                break;
            }
            RetryStep::Proceed { attempt, delay } => {
                inner.attempts.store(attempt, Ordering::SeqCst);
                info!(
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnection attempt"
                );
                inner.emit(ManagerEvent::ReconnectAttempt {
                    attempt,
                    max_attempts: policy.max_attempts(),
                });

                if !interruptible_sleep(&mut shutdown_rx, delay).await {
                    info!("reconnection cancelled during backoff delay");
                    inner.transition_if(
                        ConnectionState::Reconnecting,
                        ConnectionState::Disconnected,
                    );
                    break;
                }
                if inner.is_disposed() {
                    break;
                }

                let Some(transport) = inner.transport() else {
                    warn!("no transport provider bound, abandoning reconnection");
                    inner.transition_if(
                        ConnectionState::Reconnecting,
                        ConnectionState::Disconnected,
                    );
                    break;
                };
                match inner.try_transport_connect(&transport).await {
                    Ok(()) => {
                        if Inner::finish_connect(&inner, ConnectionState::Reconnecting).await {
                            info!(attempt, "reconnection succeeded");
                            inner.emit(ManagerEvent::ReconnectSucceeded);
                        }
                        break;
                    }
                    Err(reason) => {
                        warn!(attempt, %reason, "reconnection attempt failed");
                    }
                }
            }
        }
    }

    inner.release_reconnect_slot().await;
    debug!("reconnection engine stopped");
}

/// Heartbeat monitor: periodic probes plus an acknowledgment deadline
///
/// Exits as soon as the manager leaves `Connected` for any reason; declares
/// the connection lost when no acknowledgment arrives inside the timeout.
async fn run_heartbeat_loop(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    let interval = inner.config.heartbeat_interval();
    debug!(
        interval_ms = interval.as_millis() as u64,
        timeout_ms = inner.config.heartbeat_timeout().as_millis() as u64,
        "heartbeat monitor started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {
                if inner.is_disposed() || !inner.state().allows_heartbeat() {
                    break;
                }
                inner.send_probe().await;
                if inner.heartbeat_ack_overdue() {
                    warn!(
                        timeout_ms = inner.config.heartbeat_timeout().as_millis() as u64,
                        "no heartbeat acknowledgment within timeout, declaring connection lost"
                    );
                    Inner::handle_connection_lost(Arc::clone(&inner)).await;
                    break;
                }
            }
        }
    }
    debug!("heartbeat monitor stopped");
}
