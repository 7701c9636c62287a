//! Bounded retry with exponential backoff and jitter.
//!
//! Shared by every operation that touches infrastructure: extraction, the
//! bulk load and watermark reads and writes.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info};

use crate::errors::SyncError;

/// Retry policy for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay after the first failure, doubled after each further failure.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a one second initial delay.
    pub fn new(max_attempts: u32, max_delay: Duration, jitter: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1).min(max_delay),
            max_delay,
            jitter,
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let exponential = self.initial_delay.saturating_mul(factor);

        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..=self.jitter.as_secs_f64()))
        };

        exponential.saturating_add(jitter).min(self.max_delay)
    }

    /// Run `operation`, retrying retryable failures until it succeeds or the
    /// attempt budget is spent.
    ///
    /// Non-retryable errors are returned as they are, on the attempt they
    /// occur. Exhaustion is reported as [`SyncError::RetryExhausted`] wrapping
    /// the last error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = %operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    error!(
                        operation = %operation,
                        attempts = attempt,
                        error = %e,
                        "Retry budget exhausted"
                    );
                    return Err(SyncError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    error!(
                        operation = %operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
