//! Quota-aware retry with exponential backoff and jitter.
//!
//! Only rate-limit failures are retried. Anything else surfaces on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::LlmError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(1000);
const MAX_JITTER: Duration = Duration::from_millis(1000);

/// Errors that can tell whether they came from an exhausted request quota.
pub trait QuotaClassify {
    fn is_quota_exceeded(&self) -> bool;
}

impl QuotaClassify for LlmError {
    fn is_quota_exceeded(&self) -> bool {
        LlmError::is_quota_exceeded(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            max_jitter: MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based):
    /// `2^(attempt + 1) * base + jitter`, i.e. ~2s, ~4s, ~8s with the defaults.
    pub fn backoff_delay(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt + 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor) + jitter.min(self.max_jitter)
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// Runs `op`, retrying quota failures with backoff until `max_attempts` is reached.
/// The last error is returned once attempts run out.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: QuotaClassify,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_quota_exceeded() && attempt + 1 < max_attempts => {
                let delay = policy.backoff_delay(attempt, policy.random_jitter());
                warn!(
                    "Quota exceeded, retrying in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt + 1,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quota_error() -> LlmError {
        LlmError::Api {
            status: 429,
            message: "Too Many Requests".to_string(),
        }
    }

    #[test]
    fn test_backoff_grows_even_across_jitter_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0, Duration::ZERO), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1, Duration::ZERO), Duration::from_secs(4));
        // worst-case jitter on the first retry still beats no jitter on the second
        assert!(policy.backoff_delay(0, MAX_JITTER) < policy.backoff_delay(1, Duration::ZERO));
        assert!(policy.backoff_delay(1, MAX_JITTER) < policy.backoff_delay(2, Duration::ZERO));
    }

    #[test]
    fn test_jitter_is_capped() {
        let policy = RetryPolicy::default();
        let delay = policy.backoff_delay(0, Duration::from_secs(30));
        assert_eq!(delay, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_quota_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(quota_error())
                } else {
                    Ok("analysis")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "analysis");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s + 4s of backoff, plus at most 1s jitter each
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6), "waited {waited:?}");
        assert!(waited < Duration::from_secs(8), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_quota_error_is_attempted_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), LlmError> = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LlmError::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surfaces_last_error_after_exhausting_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), LlmError> = with_retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(LlmError::Api {
                    status: 429,
                    message: format!("quota attempt {n}"),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_ATTEMPTS);
        match result {
            Err(LlmError::Api { message, .. }) => assert_eq!(message, "quota attempt 2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_sleeps() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LlmError> = with_retry(&RetryPolicy::with_max_attempts(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(quota_error()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
