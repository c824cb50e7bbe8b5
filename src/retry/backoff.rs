//! Backoff policies for retry loops
//!
//! A policy maps an attempt number to a sleep duration. Policies are pure:
//! the same attempt always yields the same delay.

use std::time::Duration;

/// Maps a retry attempt (1 for the first retry) to the delay before it.
pub trait BackoffPolicy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Duration;
}

impl<F> BackoffPolicy for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn next_delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// Linear ramp capped at a maximum: `min(attempt * step, cap)`.
///
/// # Example
///
/// ```
/// use searchflow::retry::backoff::{BackoffPolicy, LinearBackoff};
/// use std::time::Duration;
///
/// let backoff = LinearBackoff::default();
/// assert_eq!(backoff.next_delay(1), Duration::from_millis(200));
/// assert_eq!(backoff.next_delay(100), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub step: Duration,
    pub cap: Duration,
}

impl LinearBackoff {
    pub fn new(step: Duration, cap: Duration) -> Self {
        Self { step, cap }
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(200),
            cap: Duration::from_millis(5000),
        }
    }
}

impl BackoffPolicy for LinearBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.cap)
    }
}

/// Calculate exponential backoff delay for a given attempt number.
///
/// # Arguments
///
/// * `attempt` - Current attempt number (0-indexed)
/// * `base_delay_ms` - Base delay in milliseconds for the first retry
/// * `max_delay_ms` - Maximum delay cap in milliseconds
///
/// # Example
///
/// ```
/// use searchflow::retry::backoff::exponential_backoff;
/// use std::time::Duration;
///
/// assert_eq!(exponential_backoff(0, 100, 5000), Duration::from_millis(100));
/// assert_eq!(exponential_backoff(3, 100, 5000), Duration::from_millis(800));
/// ```
pub fn exponential_backoff(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let delay_ms = base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt.min(10))) // 2^attempt with cap at 2^10
        .min(max_delay_ms);
    Duration::from_millis(delay_ms)
}

/// Exponential backoff; the first retry waits `base_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl ExponentialBackoff {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
        }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        exponential_backoff(
            attempt.saturating_sub(1),
            self.base_delay_ms,
            self.max_delay_ms,
        )
    }
}
