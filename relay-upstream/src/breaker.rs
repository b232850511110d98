//! Advisory failure breaker.
//!
//! Counts consecutive failures against one flaky upstream; after a
//! threshold, rejects calls for a fixed cooldown window instead of hitting
//! the upstream again. Single-process, in-memory, not persisted. Races
//! between concurrent requests are accepted: the breaker is advisory.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::UpstreamError;

/// Breaker tuning.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    pub threshold: u32,
    /// How long the breaker stays open once tripped.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { threshold: 4, cooldown: Duration::from_secs(10) }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Consecutive-failure counter with a cooldown window.
#[derive(Debug)]
pub struct FailureBreaker {
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl FailureBreaker {
    /// Create a closed breaker.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, state: Mutex::new(BreakerState::default()) }
    }

    /// Check whether a call may proceed. An expired cooldown window closes
    /// the breaker and resets the counter.
    ///
    /// # Errors
    /// Returns [`UpstreamError::BreakerOpen`] with the remaining cooldown
    /// while the breaker is open.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub fn check(&self) -> Result<(), UpstreamError> {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut state = self.state.lock().expect("breaker lock poisoned");
        if let Some(until) = state.open_until {
            let now = Instant::now();
            if now < until {
                return Err(UpstreamError::BreakerOpen { retry_after: until - now });
            }
            tracing::warn!("breaker cooldown expired, closing");
            state.open_until = None;
            state.consecutive_failures = 0;
        }
        Ok(())
    }

    /// Record a failed upstream call; opens the breaker at the threshold.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub fn record_failure(&self) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut state = self.state.lock().expect("breaker lock poisoned");
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.config.threshold && state.open_until.is_none() {
            state.open_until = Some(Instant::now() + self.config.cooldown);
            tracing::warn!(
                failures = state.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "breaker opened"
            );
        }
    }

    /// Record a successful upstream call; closes the breaker and resets the
    /// counter.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub fn record_success(&self) {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut state = self.state.lock().expect("breaker lock poisoned");
        state.consecutive_failures = 0;
        state.open_until = None;
    }

    /// Current consecutive-failure count.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let state = self.state.lock().expect("breaker lock poisoned");
        state.consecutive_failures
    }
}
