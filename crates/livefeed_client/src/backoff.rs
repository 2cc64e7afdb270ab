//! Reconnect backoff arithmetic and attempt tracking.
//!
//! The delay schedule is deliberately a pure function so retry timing is
//! unit-testable without a network connection.

use crate::config::RetryConfig;
use std::time::Duration;

/// Returns the backoff delay for a 0-indexed reconnect attempt.
///
/// `delay = base_delay * multiplier^attempt`, saturating on overflow.
pub fn delay_for_attempt(attempt: u32, base_delay: Duration, multiplier: u32) -> Duration {
    base_delay.saturating_mul(multiplier.saturating_pow(attempt))
}

/// Tracks consecutive reconnect attempts against a budget.
///
/// The counter resets only on construction, on a successful stream open, or
/// on an explicit refresh.
#[derive(Debug, Default)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    /// Creates a fresh retry state with zero attempts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Resets the attempt counter.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Consumes one attempt and returns the delay to wait before it, or
    /// `None` when the budget is exhausted.
    pub fn next_delay(&mut self, config: &RetryConfig) -> Option<Duration> {
        if self.attempts >= config.max_attempts {
            return None;
        }
        let mut delay = delay_for_attempt(self.attempts, config.base_delay, config.multiplier);
        if let Some(cap) = config.max_delay {
            delay = delay.min(cap);
        }
        self.attempts += 1;
        Some(delay)
    }
}
