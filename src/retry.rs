//! Exponential backoff retry combinator
//!
//! [`RetryPolicy`] wraps a fallible async operation and re-executes it with
//! exponentially growing delays. It is the single retry primitive shared by
//! the IP resolution race and every provider call: callers compose it around
//! an operation rather than baking retry loops into each call site.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS, DEFAULT_RETRY_MULTIPLIER};
use crate::error::{Error, Result};

//==============================================================================
// Policy
//==============================================================================

/// Retry policy with exponential backoff
///
/// The delay before retry `n` (1-based) is `initial_delay * multiplier^(n-1)`.
/// There is no jitter and no cap on delay growth; callers bound worst-case
/// latency by keeping `max_attempts` small (the default is 3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each failed attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            initial_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit parameters
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier,
        }
    }

    /// The delay slept after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        self.initial_delay.mul_f64(self.multiplier.powi(exponent))
    }

    /// Executes `op`, retrying on failure until an attempt succeeds or the
    /// attempt budget is exhausted
    ///
    /// The closure is invoked once per attempt. Between attempts the task
    /// sleeps asynchronously (never blocking the runtime). After the final
    /// failure the last error is surfaced wrapped in [`Error::Exhausted`],
    /// carrying the attempt count.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => {
                    warn!("operation failed after {} attempts: {}", attempt, err);
                    return Err(Error::Exhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        "attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

//==============================================================================
// Tests
//==============================================================================
