//! Linear backoff for reconnection

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use wb_core::config::ReconnectConfig;

/// Bounded linear backoff shared between the channel and its reconnect task
///
/// Attempt `n` waits `n * step`. The counter is reset after every successful
/// open and pinned at the maximum by an explicit disconnect.
pub struct LinearBackoff {
    policy: ReconnectConfig,
    /// Attempts made since the last successful open
    attempts: AtomicU32,
}

impl LinearBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            policy: *config,
            attempts: AtomicU32::new(0),
        }
    }

    /// Create a new backoff with custom parameters
    pub fn new(step: Duration, max_attempts: u32) -> Self {
        Self::from_config(&ReconnectConfig { max_attempts, step })
    }

    /// Attempt ceiling
    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// Claim the next attempt, returning its delay
    ///
    /// Returns `None` once the ceiling is reached.
    pub fn next_delay(&self) -> Option<(u32, Duration)> {
        let max = self.policy.max_attempts;
        self.attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .ok()
            .map(|previous| {
                let attempt = previous + 1;
                (attempt, self.policy.delay_for(attempt))
            })
    }

    /// Attempts made since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Start counting from zero again
    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Suppress further automatic attempts
    pub fn exhaust(&self) {
        self.attempts.store(self.policy.max_attempts, Ordering::SeqCst);
    }
}
