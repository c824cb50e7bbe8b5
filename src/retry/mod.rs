//! Call-validate-sleep loop with a bounded attempt budget.
//!
//! The engine only decides *when* to call again. What counts as an
//! acceptable result is entirely up to the caller's predicate; an action
//! returning `Result` lets the predicate accept or reject specific errors.

pub mod backoff;

use crate::config::RetryConfig;
use crate::error::{SearchflowError, SearchflowResult};
use backoff::{BackoffPolicy, LinearBackoff};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default attempt budget for completion polling
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Attempt budget and backoff for one retry loop
#[derive(Clone)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub backoff: Arc<dyn BackoffPolicy>,
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Arc::new(LinearBackoff::default()),
        }
    }
}

impl RetryOptions {
    pub fn new(max_attempts: u32, backoff: impl BackoffPolicy + 'static) -> Self {
        Self {
            max_attempts,
            backoff: Arc::new(backoff),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            LinearBackoff::new(
                Duration::from_millis(config.backoff_step_ms),
                Duration::from_millis(config.backoff_cap_ms),
            ),
        )
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Call `action` until `is_acceptable` holds for its result.
///
/// The first call happens immediately. After each rejected result the loop
/// sleeps `backoff(attempt)` (attempt starts at 1) and calls again, for at
/// most `max_attempts` calls in total. No sleep follows the last call.
///
/// Returns [`SearchflowError::RetryExhausted`] when the budget runs out and
/// [`SearchflowError::Cancelled`] when `cancel` fires before or while
/// sleeping. A call already in flight is never interrupted.
pub async fn retry_until<T, F, Fut, P>(
    mut action: F,
    is_acceptable: P,
    options: &RetryOptions,
    cancel: &CancellationToken,
) -> SearchflowResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    if options.max_attempts == 0 {
        return Err(SearchflowError::Config(
            "max_attempts must be greater than 0".to_string(),
        ));
    }

    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(SearchflowError::Cancelled);
        }

        let result = action().await;
        if is_acceptable(&result) {
            return Ok(result);
        }

        attempt += 1;
        if attempt >= options.max_attempts {
            warn!("Retry budget exhausted after {} attempts", attempt);
            return Err(SearchflowError::RetryExhausted { attempts: attempt });
        }

        let delay = options.backoff.next_delay(attempt);
        debug!(
            attempt,
            max_attempts = options.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Result not acceptable yet, sleeping before next attempt"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchflowError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
