use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;

/// Bounded retries with exponential backoff plus random jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub tries: u32,
    /// Delay before the first retry; doubled for each further attempt.
    pub base_delay: Duration,
    /// Upper bound (inclusive) of the jitter added to every delay.
    pub max_jitter: Duration,
}

/// Computes the wait before the next attempt.
pub trait BackoffPolicy {
    /// Delay after the zero-based attempt `attempt` failed.
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 2,
            base_delay: Duration::from_millis(150),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn once() -> Self {
        Self {
            tries: 1,
            ..Self::default()
        }
    }

    /// Deterministic part of the delay after the failed attempt `attempt`
    /// (zero-based): `base_delay * 2^attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    fn jitter(&self) -> Duration {
        let max = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + self.jitter()
    }
}

/// Run `op` until it succeeds or `policy.tries` attempts have failed.
///
/// Waits `policy.delay_for_attempt(n)` between attempts. The last error is
/// returned unchanged.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let tries = policy.tries.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < tries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    tries,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(tries, error = %e, "Giving up after final attempt");
                return Err(e);
            }
        }
    }
}
