//! Bounded retries with exponential backoff for flaky remote calls.

use crate::error::{Result, UzhavanError};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Longest pause between two attempts.
const MAX_DELAY: Duration = Duration::from_secs(10);

/// How many times to retry and how long to wait in between.
///
/// Only errors whose [`UzhavanError::is_retryable`] is true are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: (base_delay.as_millis() as u64).max(1),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::from_millis(1))
    }

    /// Delays of 2x, 4x, 8x... the base delay, jittered.
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay_ms)
            .max_delay(MAX_DELAY)
            .map(jitter)
            .take(self.max_retries)
    }

    /// Run `op`, retrying retryable failures up to the configured count.
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        RetryIf::start(self.strategy(), op, |e: &UzhavanError| {
            let retry = e.is_retryable();
            if retry {
                warn!("{} failed, retrying: {}", operation, e);
            }
            retry
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(250))
    }
}
