//! Pure reconnection decision logic
//!
//! Everything timing-sensitive about the reconnection engine is decided here
//! with plain functions over plain values; the impure loop in
//! [`core`](super::core) only executes the decisions.

use crate::config::ConnectionConfig;
use std::time::Duration;

/// Backoff schedule and attempt budget for one reconnection session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays_ms: Vec<u64>,
    max_attempts: u32,
}

/// Next action for the reconnection loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStep {
    /// Run attempt `attempt` after waiting `delay`
    Proceed { attempt: u32, delay: Duration },
    /// Cancellation was requested; stop without further attempts
    Cancelled,
    /// The attempt budget is spent; report exhaustion and stop
    Exhausted,
}

impl RetryPolicy {
    pub fn new(delays_ms: Vec<u64>, max_attempts: u32) -> Self {
        Self {
            delays_ms,
            max_attempts,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.retry_delays_ms.clone(), config.max_reconnect_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt` (1-based)
    ///
    /// When the attempt number exceeds the configured schedule, the last
    /// configured delay repeats indefinitely.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(last) = self.delays_ms.last() else {
            return Duration::ZERO;
        };
        let index = attempt.saturating_sub(1) as usize;
        let millis = self.delays_ms.get(index).copied().unwrap_or(*last);
        Duration::from_millis(millis)
    }

    /// Decide what the loop should do after `attempts_made` completed attempts
    pub fn next_step(&self, attempts_made: u32, cancelled: bool) -> RetryStep {
        if cancelled {
            return RetryStep::Cancelled;
        }
        if attempts_made >= self.max_attempts {
            return RetryStep::Exhausted;
        }
        let attempt = attempts_made + 1;
        RetryStep::Proceed {
            attempt,
            delay: self.delay_for_attempt(attempt),
        }
    }

    /// Human-readable reason used for the exhaustion notification
    pub fn exhaustion_reason(&self) -> String {
        format!(
            "max reconnection attempts ({}) exceeded",
            self.max_attempts
        )
    }
}
