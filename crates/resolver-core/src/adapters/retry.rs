//! Bounded exponential backoff for idempotent reads.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::{ResolverError, RetryConfig};

/// Retry policy for read-only ledger calls.
///
/// Only transient errors are retried. Writes never go through this path:
/// a repeated broadcast is not idempotent.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial: Duration::from_millis(config.initial_backoff_ms),
            cap: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Run `op`, retrying transient failures.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ResolverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResolverError>>,
    {
        let mut delay = self.initial;
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "[resolver] {} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.cap);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}
