//! Backoff between retries of platform REST calls.
//!
//! Only role lookups and role mutations go through this policy; both are
//! idempotent, so repeating them after a transient failure is safe.

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Doubles the wait after every failed attempt, starting at 250ms and never
/// waiting more than 5s. Interaction replies must go out within a few seconds
/// of the button press, so the schedule stays short.
pub struct RetryAfterPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryAfterPolicy {
    /// Policy giving up after `max_retries` retries (`HTTP_MAX_RETRIES`).
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait before retry number `past_retries + 1`.
    fn exponential_delay(&self, past_retries: u32) -> Duration {
        let factor = 2u32.saturating_pow(past_retries);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl RetryPolicy for RetryAfterPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }
        RetryDecision::Retry {
            execute_after: SystemTime::now() + self.exponential_delay(n_past_retries),
        }
    }
}
