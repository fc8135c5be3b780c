//! Retry with exponential backoff for transient upstream failures.
//!
//! Only timeouts, unreachable networks and server faults are retried.
//! Not-found, unauthorized and rate-limited responses fail immediately.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Calculate the delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently or retries run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.kind().is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        request = what,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures_twice() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Timeout) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_server_fault() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::ServerFault {
                            status: 503,
                            message: String::new(),
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::NotFound) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
