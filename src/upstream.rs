//! Timeout and retry for calls to external services
//!
//! Every attempt is bounded by the policy timeout. Retryable failures back
//! off exponentially (`initial * 2^(attempt-1)`), except when the server sent
//! a `Retry-After` hint, which is used as-is. A hint longer than
//! `max_retry_after` ends the call immediately as rate-limited.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{UpstreamError, UpstreamKind};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based) when no hint was given
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// A single failed attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptError {
    pub kind: UpstreamKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl AttemptError {
    pub fn new(kind: UpstreamKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    service: &str,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let failure = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => AttemptError::new(
                UpstreamKind::Timeout,
                format!("no response within {}s", policy.timeout.as_secs_f64()),
            ),
        };

        let give_up = |message: String| UpstreamError {
            service: service.to_string(),
            kind: failure.kind,
            attempts: attempt,
            message,
        };

        if !failure.kind.is_retryable() {
            return Err(give_up(failure.message.clone()));
        }
        if attempt >= max_attempts {
            warn!("{service} {} - max attempts ({max_attempts}) reached", failure.kind);
            return Err(give_up(failure.message.clone()));
        }

        let delay = match failure.retry_after {
            Some(hint) if hint > policy.max_retry_after => {
                let secs = hint.as_secs();
                warn!("{service} asked to retry after {secs}s; not waiting that long");
                return Err(give_up(format!(
                    "{} (server asked to wait {}s)",
                    failure.message, secs
                )));
            }
            Some(hint) => hint,
            None => policy.backoff_for(attempt),
        };

        warn!(
            "{service} {} ({}) - retry {attempt}/{} after {}ms",
            failure.kind,
            failure.message,
            max_attempts - 1,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
    }
}

/// Parse a `Retry-After` header: delta-seconds or an HTTP date
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let wait = when.signed_duration_since(now);
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
            max_retry_after: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&fast_policy(), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(AttemptError::new(UpstreamKind::ServerError(503), "busy"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&fast_policy(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::new(UpstreamKind::RateLimited, "slow down"))
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::RateLimited);
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_protocol_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&fast_policy(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::new(UpstreamKind::Protocol, "bad json"))
        })
        .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_retryable_failure() {
        let policy = RetryPolicy {
            max_attempts: 2,
            timeout: Duration::from_millis(10),
            ..fast_policy()
        };
        let result: Result<(), _> = call_with_retry(&policy, "test", || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Timeout);
        assert_eq!(err.attempts, 2);
    }

    #[tokio::test]
    async fn test_long_retry_after_aborts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&fast_policy(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::new(UpstreamKind::RateLimited, "429")
                .with_retry_after(Some(Duration::from_secs(3600))))
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::RateLimited);
        assert!(err.message.contains("3600"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_retry_after() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
