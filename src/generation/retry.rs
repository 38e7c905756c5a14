//! Retry policy for provider calls.

use crate::error::ProviderError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Ceiling for the fallback delay; provider-suggested delays are not capped.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential fallback for the given zero-based retry index.
    pub fn fallback_delay(&self, retry_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_index);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before the next attempt, or `None` when the error must be surfaced.
    pub fn next_delay(&self, error: &ProviderError, retry_index: u32) -> Option<Duration> {
        if !error.is_retryable() || retry_index >= self.max_retries {
            return None;
        }
        Some(
            error
                .retry_after()
                .unwrap_or_else(|| self.fallback_delay(retry_index)),
        )
    }
}
