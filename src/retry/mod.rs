//! Exponential backoff retry.
//!
//! [`RetryPolicy`] runs an async operation up to `max_attempts` times. Each
//! failure is normalized; non-retryable failures and the final attempt end the
//! run with that failure, anything else sleeps `base * 2^attempt` plus random
//! jitter (capped at `max_delay`) and tries again.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{parse, Failure, NormalizedError};

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound on any single backoff sleep.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default jitter window. Jitter is drawn uniformly from `[0, jitter)`.
pub const DEFAULT_JITTER: Duration = Duration::from_millis(1000);

/// State of one retry run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrySession {
    /// Zero-based index of the current attempt.
    pub attempt: u32,
    /// Total attempts allowed, always at least one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl RetrySession {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// True when the current attempt is the last one allowed.
    pub fn is_last_attempt(&self) -> bool {
        self.attempt + 1 >= self.max_attempts
    }

    /// Attempts left after the current one.
    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt + 1)
    }
}

/// Backoff parameters for retrying fallible async operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single sleep, jitter included.
    pub max_delay: Duration,
    /// Width of the random jitter window.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default cap and jitter.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Attempt budget with zero raised to one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the failed attempt `attempt` (zero-based), without jitter.
    ///
    /// Computed as `base_delay * 2^attempt`, saturating, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1u64 << attempt.min(31);
        let base_millis = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(base_millis.saturating_mul(multiplier));
        delay.min(self.max_delay)
    }

    /// Delay after the failed attempt `attempt`, with jitter, capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let jitter_millis = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_millis == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..jitter_millis))
        };

        self.backoff(attempt)
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    /// Whether the retry loop runs again after the failed attempt `attempt`
    /// (zero-based): the budget is not spent and the error is retryable.
    pub fn can_retry(&self, error: &NormalizedError, attempt: u32) -> bool {
        attempt + 1 < self.attempts() && error.is_retryable()
    }

    /// Stricter check for callers deciding on their own whether to retry.
    ///
    /// Like [`RetryPolicy::can_retry`], but also refuses client errors other
    /// than 429, even when they are marked retryable. The retry loop itself
    /// does not apply this filter.
    pub fn should_retry(&self, error: &NormalizedError, attempt: u32) -> bool {
        self.can_retry(error, attempt)
            && !matches!(error.status_code(), Some(status) if (400..500).contains(&status) && status != 429)
    }

    /// Runs `op` until it succeeds or the policy gives up.
    ///
    /// The error returned is the normalized failure of the last attempt made.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        self.run_with_observer(op, |_, _, _| {}).await
    }

    /// Like [`RetryPolicy::run`], calling `on_retry` before each backoff sleep
    /// with the session, the failure that triggered the retry and the delay.
    pub async fn run_with_observer<T, E, F, Fut, O>(
        &self,
        mut op: F,
        mut on_retry: O,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Failure>,
        O: FnMut(&RetrySession, &NormalizedError, Duration),
    {
        let mut session = RetrySession::new(self.max_attempts, self.base_delay);

        loop {
            debug!(
                attempt = session.attempt + 1,
                max_attempts = session.max_attempts,
                "Running attempt"
            );

            let error = match op().await {
                Ok(value) => {
                    if session.attempt > 0 {
                        debug!(attempts = session.attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => parse(failure),
            };

            if !self.can_retry(&error, session.attempt) {
                debug!(
                    attempt = session.attempt + 1,
                    kind = %error.kind(),
                    retryable = error.is_retryable(),
                    "Giving up: {}",
                    error
                );
                return Err(error);
            }

            let delay = self.calculate_delay(session.attempt);
            warn!(
                attempt = session.attempt + 1,
                max_attempts = session.max_attempts,
                delay_ms = delay.as_millis() as u64,
                kind = %error.kind(),
                "Attempt failed, retrying: {}",
                error
            );
            on_retry(&session, &error, delay);

            tokio::time::sleep(delay).await;
            session.attempt += 1;
        }
    }
}

/// Retries `op` with exponential backoff, the default cap and jitter.
pub async fn retry_with_backoff<T, E, F, Fut>(
    op: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, NormalizedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    RetryPolicy::new(max_attempts, base_delay).run(op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, NativeFailure};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn no_jitter(max_attempts: u32, base_ms: u64) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(base_ms)).with_jitter(Duration::ZERO)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.jitter, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = no_jitter(5, 1000);
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = no_jitter(10, 1000).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.backoff(3), Duration::from_secs(5));
        assert_eq!(policy.backoff(200), Duration::from_secs(5));
    }

    #[test]
    fn test_calculate_delay_jitter_window() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        for _ in 0..200 {
            let delay = policy.calculate_delay(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_calculate_delay_cap_includes_jitter() {
        let policy = RetryPolicy::new(3, Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(10));
        for _ in 0..50 {
            assert_eq!(policy.calculate_delay(0), Duration::from_secs(10));
        }
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let server = NormalizedError::new(ErrorKind::Server, "boom").with_status(503);
        let missing = NormalizedError::new(ErrorKind::NotFound, "gone").with_status(404);
        let limited = NormalizedError::new(ErrorKind::RateLimit, "slow").with_status(429);

        assert!(policy.should_retry(&server, 0));
        assert!(policy.should_retry(&server, 1));
        assert!(!policy.should_retry(&server, 2));
        assert!(!policy.should_retry(&missing, 0));
        assert!(policy.should_retry(&limited, 0));
    }

    #[test]
    fn test_can_retry_ignores_client_status() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let timeout = NormalizedError::new(ErrorKind::Timeout, "deadline").with_status(408);

        assert!(timeout.is_retryable());
        assert!(policy.can_retry(&timeout, 0));
        assert!(policy.can_retry(&timeout, 1));
        assert!(!policy.can_retry(&timeout, 2));
        assert!(!policy.should_retry(&timeout, 0));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.attempts(), 1);
        let server = NormalizedError::new(ErrorKind::Server, "boom");
        assert!(!policy.should_retry(&server, 0));
    }

    #[test]
    fn test_session() {
        let mut session = RetrySession::new(3, Duration::from_millis(5));
        assert_eq!(session.remaining(), 2);
        assert!(!session.is_last_attempt());
        session.attempt = 2;
        assert!(session.is_last_attempt());
        assert_eq!(session.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = no_jitter(3, 100)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(NativeFailure::new("TypeError", "Failed to fetch"))
                    } else {
                        Ok::<_, NativeFailure>("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms after the first failure, 200ms after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = no_jitter(5, 100)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(NormalizedError::new(ErrorKind::NotFound, "gone").with_status(404)) }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_client_status_uses_full_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(NativeFailure::new("TimeoutError", "deadline").with_status(408)) }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert_eq!(error.status_code(), Some(408));
        assert!(error.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_failure() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = no_jitter(3, 10)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err(NormalizedError::new(ErrorKind::Server, format!("failure {}", n))
                        .with_status(503))
                }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(error.message(), "failure 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_each_retry() {
        let mut seen = Vec::new();

        let result: Result<(), _> = no_jitter(3, 50)
            .run_with_observer(
                || async { Err(NativeFailure::new("TimeoutError", "deadline")) },
                |session, error, delay| seen.push((session.attempt, error.kind(), delay)),
            )
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Timeout);
        assert_eq!(
            seen,
            vec![
                (0, ErrorKind::Timeout, Duration::from_millis(50)),
                (1, ErrorKind::Timeout, Duration::from_millis(100)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_free_function() {
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(serde_json::json!({"status": 502, "message": "bad gateway"}))
                    } else {
                        Ok(n)
                    }
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap(), 1);
    }
}
