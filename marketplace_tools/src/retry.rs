//! A single retry-with-backoff utility shared by every remote call site.
//!
//! The token refresher, the order fetcher and the ledger aggregator all retry transient
//! failures the same way: a bounded attempt budget with exponentially growing, capped delays
//! and a little jitter. Whether an error is transient is decided by the caller's predicate.
use std::{fmt::Display, future::Future, time::Duration};

use log::*;
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    /// The delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op`, retrying failures that `is_retryable` accepts, up to `policy.max_attempts` total
/// attempts. Non-retryable errors and the final attempt's error are returned as-is.
pub async fn with_backoff<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.delay_for(attempt);
                warn!("📡️ {label} attempt {attempt}/{} failed: {e}. Retrying in {delay:?}", policy.max_attempts);
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                tokio::time::sleep(delay + jitter).await;
                attempt += 1;
            },
            Err(e) => {
                debug!("📡️ {label} failed after {attempt} attempt(s): {e}");
                return Err(e);
            },
        }
    }
}
