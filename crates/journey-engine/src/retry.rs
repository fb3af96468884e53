//! Bounded retry with exponential backoff for idempotent remote calls

use crate::error::EngineError;
use journey_live_core::config::RetryConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay(),
            max_jitter: config.max_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following failed attempt number `attempt`:
    /// `2^attempt * base_delay` plus uniform jitter.
    ///
    /// `attempt` counts from 1, not 0. With the default 500ms base the waits
    /// after the first and second failures are 1s and 2s, and `delay(0)` is
    /// never used by [`perform_with_retry`].
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let backoff = self.base_delay.saturating_mul(factor);
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_nanos = u64::try_from(self.max_jitter.as_nanos()).unwrap_or(u64::MAX);
            Duration::from_nanos(rand::thread_rng().gen_range(0..max_nanos))
        };
        backoff + jitter
    }
}

/// Run `operation` until it succeeds, attempts run out or `cancel` fires.
///
/// Gives up silently: exhaustion is logged with `warn!` and reported as
/// `None`, cancellation returns `None` without a warning.
pub async fn perform_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            debug!(operation = label, attempt, "Retry aborted by cancellation");
            return None;
        }

        match operation().await {
            Ok(value) => return Some(value),
            Err(e) if e.is_cancelled() => {
                debug!(operation = label, attempt, "Operation cancelled");
                return None;
            }
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                debug!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, backing off: {e}"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(operation = label, attempt, "Backoff interrupted by cancellation");
                        return None;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                warn!(
                    operation = label,
                    attempts = policy.max_attempts,
                    "Giving up after {} attempts: {e}",
                    policy.max_attempts
                );
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn test_delay_is_exponential_with_bounded_jitter() {
        let policy = policy();
        for _ in 0..50 {
            let first = policy.delay(1);
            assert!(first >= Duration::from_millis(1000));
            assert!(first < Duration::from_millis(1050));

            let second = policy.delay(2);
            assert!(second >= Duration::from_millis(2000));
            assert!(second < Duration::from_millis(2050));
        }
    }

    #[test]
    fn test_delay_without_jitter_is_exact() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_two_backoffs() {
        let attempts = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let counter = Arc::clone(&attempts);
        let result = perform_with_retry("register", &policy(), &CancellationToken::new(), || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(EngineError::platform("unavailable"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Some(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let result: Option<()> =
            perform_with_retry("register", &policy(), &CancellationToken::new(), || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(EngineError::platform("down"))
                }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt_does_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = perform_with_retry("register", &policy(), &cancel, || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_stops_retrying() {
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let trigger = cancel.clone();

        let result: Option<()> = perform_with_retry("register", &policy(), &cancel, || {
            let counter = Arc::clone(&counter);
            let trigger = trigger.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                Err(EngineError::platform("down"))
            }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_error_stops_without_retry() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let result: Option<()> =
            perform_with_retry("register", &policy(), &CancellationToken::new(), || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(EngineError::Cancelled)
                }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
