//! Retry with exponential backoff.
//!
//! Used for history-store appends, where a transient write failure must
//! not lose a transition.

use std::future::Future;
use std::time::Duration;

/// Retry policy: attempt count and backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Backoff to sleep after the given zero-based failed attempt.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Failures between attempts are logged at warn level; the final error is
/// returned to the caller.
///
/// # Errors
///
/// Returns the last error produced by `op` when all attempts fail.
pub async fn retry<T, E, F, Fut>(config: RetryConfig, what: &str, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    what,
                    attempt = attempt + 1,
                    attempts,
                    error = %e,
                    "operation failed"
                );
                last_err = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(config.backoff_for(attempt)).await;
                }
            },
        }
    }
    // attempts >= 1, so at least one error was recorded
    match last_err {
        Some(e) => Err(e),
        None => unreachable!("retry ran zero attempts"),
    }
}
