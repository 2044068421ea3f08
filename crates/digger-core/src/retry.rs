//! Reusable retry policy shared by providers and scrapers.
//!
//! Whether a failure is worth repeating is decided by the taxonomy
//! ([`ErrorKind::is_retryable`]); the policy only decides how often and how
//! long to wait in between.

use crate::taxonomy::{Classify, ErrorKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Default number of attempts, first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;

/// Rate limits wait this many times longer than other retryable failures.
pub const RATE_LIMIT_BACKOFF_MULTIPLIER: u32 = 3;

/// Growth of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay every time
    Fixed,
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
}

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Delay unit in milliseconds
    pub base_delay_ms: u64,
    /// Delay growth
    pub backoff: Backoff,
    /// Extra factor applied after a rate limit
    pub rate_limit_multiplier: u32,
    /// Add up to 25% random jitter
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            backoff: Backoff::Linear,
            rate_limit_multiplier: RATE_LIMIT_BACKOFF_MULTIPLIER,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default delays.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Single attempt, never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Set the delay unit.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the delay growth.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another attempt should follow failed attempt number `attempt`
    /// (1-based).
    #[must_use]
    pub fn should_retry(&self, attempt: u32, kind: ErrorKind) -> bool {
        kind.is_retryable() && attempt < self.max_attempts
    }

    /// Delay before the attempt following failed attempt number `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, kind: ErrorKind) -> Duration {
        let attempt = attempt.max(1);
        let factor: u64 = match self.backoff {
            Backoff::Fixed => 1,
            Backoff::Linear => u64::from(attempt),
            Backoff::Exponential => 1u64 << (attempt - 1).min(16),
        };
        let multiplier = if kind == ErrorKind::RateLimited {
            u64::from(self.rate_limit_multiplier.max(1))
        } else {
            1
        };

        let mut millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .saturating_mul(multiplier);
        if self.jitter && millis > 0 {
            millis += rand::thread_rng().gen_range(0..=millis / 4);
        }
        Duration::from_millis(millis)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let kind = e.kind();
                    if !self.should_retry(attempt, kind) {
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt, kind);
                    tracing::warn!(
                        "{} failed with {} (attempt {}/{}), retrying in {:?}...",
                        label,
                        kind,
                        attempt,
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("test failure: {0}")]
    struct TestError(ErrorKind);

    impl Classify for TestError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn test_default_constants() {
        const _: () = assert!(DEFAULT_MAX_ATTEMPTS > 0);
        const _: () = assert!(DEFAULT_MAX_ATTEMPTS <= 5);
        const _: () = assert!(DEFAULT_BASE_DELAY_MS >= 1000);
        const _: () = assert!(RATE_LIMIT_BACKOFF_MULTIPLIER > 1);
    }

    #[test]
    fn test_linear_delay_and_rate_limit_multiplier() {
        let policy = RetryPolicy::default().with_jitter(false);
        assert_eq!(
            policy.delay_for(1, ErrorKind::ReadTimeout),
            Duration::from_millis(2000)
        );
        assert_eq!(
            policy.delay_for(2, ErrorKind::ReadTimeout),
            Duration::from_millis(4000)
        );
        assert_eq!(
            policy.delay_for(1, ErrorKind::RateLimited),
            Duration::from_millis(6000)
        );
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::default()
            .with_backoff(Backoff::Exponential)
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(false);
        assert_eq!(policy.delay_for(1, ErrorKind::ServerError), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3, ErrorKind::ServerError), Duration::from_millis(400));
    }

    #[test]
    fn test_should_retry_uses_taxonomy() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(1, ErrorKind::ConnectTimeout));
        assert!(!policy.should_retry(3, ErrorKind::ConnectTimeout));
        assert!(!policy.should_retry(1, ErrorKind::AccessDenied));
    }

    #[tokio::test]
    async fn test_run_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, TestError> = fast()
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(TestError(ErrorKind::ReadTimeout))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast()
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError(ErrorKind::NotFound)) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast()
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError(ErrorKind::ServerError)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
