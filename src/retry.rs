//! Fixed-delay retry for throttled requests
//!
//! The batch endpoint answers HTTP 429 when the caller is over quota. The
//! executor recovers by waiting a fixed delay and re-sending the same batch,
//! up to a configured number of times. Waiting goes through the [`Sleeper`]
//! trait so tests can observe delays without spending wall-clock time.
//!
//! # Example
//!
//! ```no_run
//! use mailbox_carbon::config::RateLimitConfig;
//! use mailbox_carbon::error::Error;
//! use mailbox_carbon::retry::{TokioSleeper, retry_rate_limited};
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RateLimitConfig::default();
//! let body = retry_rate_limited(&config, &TokioSleeper, |attempt| async move {
//!     // Send the request; return Error::RateLimited on HTTP 429
//!     Ok::<_, Error>(format!("sent on attempt {attempt}"))
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RateLimitConfig;
use crate::error::Error;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be re-sent unchanged
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        // Only provider throttling is retried. Network, status and decode errors abort the run.
        matches!(self, Error::RateLimited { .. })
    }
}

/// Async delay used for pacing and retry waits
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Sleeper that returns immediately and records every requested delay
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    delays: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget is spent
///
/// `operation` receives the 1-based attempt number. Retryable errors wait
/// `config.retry_delay` before the next attempt; at most
/// `config.max_retries` retries follow the first attempt.
///
/// # Returns
///
/// The first success, the first non-retryable error, or the last retryable
/// error once the budget is exhausted.
pub async fn retry_rate_limited<F, Fut, T, E>(
    config: &RateLimitConfig,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt: u32 = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Request succeeded after rate-limit retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt <= config.max_retries => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    delay_ms = config.retry_delay.as_millis(),
                    "Rate limited, retrying same request"
                );

                sleeper.sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Request still rate limited after all retries"
                    );
                } else {
                    tracing::debug!(error = %e, "Request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(max_retries: u32) -> RateLimitConfig {
        RateLimitConfig {
            retry_delay: Duration::from_millis(2000),
            max_retries,
        }
    }

    #[tokio::test]
    async fn test_success_no_retry() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_rate_limited(&config(3), &sleeper, |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_one_rate_limit_then_success_waits_once() {
        let sleeper = RecordingSleeper::new();

        let result = retry_rate_limited(&config(3), &sleeper, |attempt| async move {
            if attempt == 1 {
                Err(Error::RateLimited { attempts: attempt })
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(2000)]);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_rate_limited(&config(2), &sleeper, |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::RateLimited { attempts: attempt })
            }
        })
        .await;

        match result {
            Err(Error::RateLimited { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected rate limit error, got {other:?}"),
        }
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "should try initial + 2 retries"
        );
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_no_retry() {
        let sleeper = RecordingSleeper::new();
        let counter = Arc::new(AtomicU32::new(0));

        let result = retry_rate_limited(&config(5), &sleeper, |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Batch {
                    status: 500,
                    body: "backend".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Batch { status: 500, .. })));
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "should not retry permanent error"
        );
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_zero_budget_surfaces_first_rate_limit() {
        let sleeper = RecordingSleeper::new();

        let result = retry_rate_limited(&config(0), &sleeper, |attempt| async move {
            Err::<(), _>(Error::RateLimited { attempts: attempt })
        })
        .await;

        assert!(matches!(result, Err(Error::RateLimited { attempts: 1 })));
        assert!(sleeper.delays().is_empty());
    }

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(Error::RateLimited { attempts: 1 }.is_retryable());
        assert!(!Error::Api { status: 429 }.is_retryable());
        assert!(!Error::EmptyBatchResponse.is_retryable());
        assert!(!Error::Auth("no token".into()).is_retryable());
    }

    #[tokio::test]
    async fn tokio_sleeper_skips_zero_delay() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
