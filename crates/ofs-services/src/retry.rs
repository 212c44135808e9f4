//! Bounded retry with exponential backoff for storage writes.

use ofs_storage::{StorageError, StorageResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Caps exponential growth so high retry counts do not produce excessively long delays.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Primary writes: the caller is waiting, keep the total delay short.
    pub fn primary(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }

    /// Archive writes run in the background and can afford to wait longer.
    pub fn archive(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    #[inline]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-transient error, or the
    /// retries are used up. Returns the value and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> (StorageResult<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => return (Ok(value), attempt),
                Err(e) if e.is_transient() && attempt <= self.max_retries => {
                    let delay = self.backoff(attempt - 1);
                    tracing::warn!(
                        operation = operation,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Storage write failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }
}
