//! Bounded exponential backoff for rate-limited requests.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::FetchError;

/// Retry policy applied to individual provider calls.
///
/// Only rate-limit responses (HTTP 429) are retried: the upstream has told
/// us to slow down, so waiting and repeating the same call is meaningful.
/// Timeouts and other failures pass through untouched - they are handled
/// by provider failover and the circuit breaker instead.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// First backoff delay; doubles on each subsequent attempt.
    pub base_delay: Duration,
    /// Additional attempts after the first before the error surfaces.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 2,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given base delay and retry budget.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Run `op`, retrying on 429 with exponential backoff.
    ///
    /// The operation is attempted at most `1 + max_attempts` times. Once
    /// the budget is exhausted the final `RateLimited` error surfaces to
    /// the caller.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(FetchError::RateLimited { .. }) if attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "{}: rate limited, retrying in {:?} (attempt {}/{})",
                        provider, delay, attempt, self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Apply the hard per-call timeout to a single attempt.
///
/// Elapse maps to [`FetchError::Timeout`], which is never retried by the
/// backoff policy.
pub(crate) async fn with_timeout<T, Fut>(
    provider: &str,
    limit: Duration,
    fut: Fut,
) -> Result<T, FetchError>
where
    Fut: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            provider: provider.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> FetchError {
        FetchError::RateLimited {
            provider: "TEST".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_429_attempted_exactly_budget_times() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 2);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = policy
            .run("TEST", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(rate_limited())
                }
            })
            .await;

        // 1 initial attempt + 2 retries, then the error surfaces.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(FetchError::RateLimited { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_429() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 2);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let result = policy
            .run("TEST", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(rate_limited())
                    } else {
                        Ok(7u32)
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn non_429_errors_are_not_retried() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 2);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = policy
            .run("TEST", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Http {
                        provider: "TEST".to_string(),
                        status: 500,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FetchError::Http { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delay_grows_exponentially() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 2);
        let start = tokio::time::Instant::now();

        let _: Result<(), _> = policy
            .run("TEST", || async { Err(rate_limited()) })
            .await;

        // 1s after the first attempt, 2s after the second.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_timeout_error() {
        let result: Result<(), _> = with_timeout(
            "TEST",
            Duration::from_secs(10),
            std::future::pending::<Result<(), FetchError>>(),
        )
        .await;

        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_completion_passes_through_timeout() {
        let result = with_timeout("TEST", Duration::from_secs(10), async { Ok(1u32) }).await;
        assert_eq!(result.ok(), Some(1));
    }
}
