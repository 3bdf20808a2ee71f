//! Mock implementations for testing
//!
//! Provides a scriptable [`MockTransport`] so manager behavior can be tested
//! without any real network transport.

use crate::transport::{TransportError, TransportProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock transport provider with scriptable connect outcomes
///
/// Connect attempts consume outcomes from a queue; once the queue is empty
/// every further attempt uses the default outcome. Call counts and sent
/// payloads are recorded for assertions.
#[derive(Debug)]
pub struct MockTransport {
    connect_outcomes: Mutex<VecDeque<bool>>,
    default_connect_ok: AtomicBool,
    connect_delay_ms: AtomicU64,
    connect_calls: AtomicU32,
    disconnect_calls: AtomicU32,
    fail_sends: AtomicBool,
    connected: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Transport whose connect attempts always succeed
    pub fn new() -> Arc<Self> {
        Self::with_outcomes([], true)
    }

    /// Transport whose connect attempts always fail
    pub fn always_failing() -> Arc<Self> {
        Self::with_outcomes([], false)
    }

    /// Transport with a scripted outcome per connect attempt; later attempts
    /// fall back to `default_ok`
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = bool>, default_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            connect_outcomes: Mutex::new(outcomes.into_iter().collect()),
            default_connect_ok: AtomicBool::new(default_ok),
            connect_delay_ms: AtomicU64::new(0),
            connect_calls: AtomicU32::new(0),
            disconnect_calls: AtomicU32::new(0),
            fail_sends: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Make every send attempt fail from now on
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make every connect attempt suspend for `delay` before resolving
    pub fn set_connect_delay(&self, delay: Duration) {
        self.connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub async fn sent_payloads(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl TransportProvider for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = Duration::from_millis(self.connect_delay_ms.load(Ordering::SeqCst));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let ok = self
            .connect_outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_connect_ok.load(Ordering::SeqCst));
        if ok {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            self.connected.store(false, Ordering::SeqCst);
            Err(TransportError::ConnectFailed(
                "mock connect refused".to_string(),
            ))
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("mock send refused".to_string()));
        }
        self.sent.lock().await.push(payload.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
