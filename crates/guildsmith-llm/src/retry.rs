//! Request spacing and retries.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further one.
    pub base_backoff: Duration,
    /// Minimum spacing between calls.
    pub min_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt at zero-based index `attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }
}

/// Keeps calls at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until the next call is allowed, then claim it.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(ready) = last.and_then(|prev| prev.checked_add(self.min_interval))
            && ready > Instant::now()
        {
            debug!(
                wait = ?ready.saturating_duration_since(Instant::now()),
                "Spacing out model request"
            );
            tokio::time::sleep_until(ready).await;
        }
        *last = Some(Instant::now());
    }
}

/// Wraps a provider with spacing and retries.
///
/// Empty replies count as failed attempts. Errors that another attempt
/// cannot fix (missing key, bad configuration) are returned at once.
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
    limiter: RateLimiter,
}

impl<P: LlmProvider> RetryingProvider<P> {
    /// Wrap a provider.
    #[must_use]
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(policy.min_interval),
            policy,
        }
    }
}

#[async_trait]
impl<P: LlmProvider> LlmProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, system: &str, prompt: &str) -> LlmResult<String> {
        self.limiter.acquire().await;

        let attempts = self.policy.max_attempts.max(1);
        let mut last = LlmError::EmptyResponse;
        for attempt in 0..attempts {
            let number = attempt.saturating_add(1);
            info!(provider = self.inner.name(), attempt = number, attempts, "Model request");

            match self.inner.complete(system, prompt).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    warn!(attempt = number, "Empty model response");
                    last = LlmError::EmptyResponse;
                },
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(attempt = number, error = %e, "Model request failed");
                    last = e;
                },
            }

            if number < attempts {
                let mut wait = self.policy.backoff(attempt);
                if let LlmError::RateLimitExceeded { retry_after_secs } = &last {
                    wait = wait.max(Duration::from_secs(*retry_after_secs));
                }
                tokio::time::sleep(wait).await;
            }
        }

        error!(attempts, error = %last, "All model request attempts failed");
        Err(LlmError::Exhausted {
            attempts,
            last: last.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        replies: StdMutex<VecDeque<LlmResult<String>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<LlmResult<String>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> LlmResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn failure() -> LlmResult<String> {
        Err(LlmError::ApiRequestFailed("connection reset".to_string()))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(40), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failure() {
        let provider = RetryingProvider::new(
            Scripted::new(vec![failure(), Ok("{}".to_string())]),
            RetryPolicy::default(),
        );
        let started = Instant::now();
        assert_eq!(provider.complete("sys", "hi").await.unwrap(), "{}");
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_with_backoff() {
        let provider = RetryingProvider::new(
            Scripted::new(vec![failure(), Ok("   ".to_string()), failure()]),
            RetryPolicy::default(),
        );
        let started = Instant::now();
        let err = provider.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Exhausted { attempts: 3, .. }));
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_not_retried() {
        let provider = RetryingProvider::new(
            Scripted::new(vec![Err(LlmError::ApiKeyNotConfigured {
                provider: "openai".to_string(),
            })]),
            RetryPolicy::default(),
        );
        let err = provider.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced() {
        let provider = RetryingProvider::new(
            Scripted::new(vec![Ok("a".to_string()), Ok("b".to_string())]),
            RetryPolicy::default(),
        );
        let started = Instant::now();
        provider.complete("sys", "one").await.unwrap();
        provider.complete("sys", "two").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
