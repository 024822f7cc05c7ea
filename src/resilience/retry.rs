//! Retry policy for the upstream lookup.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries).
//! - `should_retry` decides which failures get another attempt; the default is
//!   [`UpstreamError::is_transient`]. `CircuitOpen` is never retried, whatever the predicate says.
//! - Delay before retry `n` (1-indexed) is `base_delay * 2^(n-1)`, capped at `max_delay`,
//!   then optionally randomized with full jitter.
//! - A failure the predicate rejects is returned unchanged, without waiting.
//! - When all attempts fail, a multi-attempt policy reports `RetriesExhausted` carrying the
//!   last failure; a single-attempt policy returns that failure unchanged.

use crate::error::{ConfigError, UpstreamError};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How retry delays are randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// Use the computed delay as is.
    None,
    /// Pick uniformly in `[0, delay]`.
    Full,
}

type RetryPredicate = Arc<dyn Fn(&UpstreamError) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Jitter,
    should_retry: RetryPredicate,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .field("should_retry", &"<predicate>")
            .finish()
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// A policy that tries once and never waits.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Jitter::None,
            should_retry: Arc::new(UpstreamError::is_transient),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Un-jittered delay before retry number `retry` (1-indexed).
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exp = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX).min(31);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        match self.jitter {
            Jitter::None => delay,
            Jitter::Full => {
                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::rng().random_range(0..=millis))
            }
        }
    }

    /// Run `operation` until it succeeds or the attempts run out.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<T, UpstreamError>
    where
        Fut: Future<Output = Result<T, UpstreamError>>,
        Op: FnMut() -> Fut,
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_circuit_open() || !(self.should_retry)(&e) => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                if self.max_attempts == 1 {
                    return Err(err);
                }
                return Err(UpstreamError::RetriesExhausted {
                    attempts: self.max_attempts,
                    last: Box::new(err),
                });
            }

            let delay = self.jittered(self.delay_for(attempt));
            tracing::warn!(attempt, ?delay, error = %err, "upstream attempt failed; retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Jitter,
    should_retry: RetryPredicate,
}

impl std::fmt::Debug for RetryPolicyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl RetryPolicyBuilder {
    /// Defaults: 3 attempts, 2s base delay capped at 30s, full jitter, transient failures only.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: Jitter::Full,
            should_retry: Arc::new(UpstreamError::is_transient),
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Decide which failures are worth another attempt.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&UpstreamError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Validate and build. Errors if `max_attempts` is zero.
    pub fn build(self) -> Result<RetryPolicy, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay.max(self.base_delay),
            jitter: self.jitter,
            should_retry: self.should_retry,
        })
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no_wait(attempts: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(attempts)
            .base_delay(Duration::ZERO)
            .jitter(Jitter::None)
            .build()
            .unwrap()
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = RetryPolicy::builder().max_attempts(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxAttempts(0));
    }

    #[test]
    fn exponential_delays_are_capped() {
        let policy = RetryPolicy::builder()
            .base_delay(Duration::from_secs(2))
            .max_delay(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(5));
        assert_eq!(policy.delay_for(200), Duration::from_secs(5));
    }

    #[test]
    fn full_jitter_stays_within_delay() {
        let policy = RetryPolicy::builder().jitter(Jitter::Full).build().unwrap();
        for _ in 0..50 {
            assert!(policy.jittered(Duration::from_millis(100)) <= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let result = no_wait(3)
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(UpstreamError::Status(503))
                } else {
                    Ok(29.5)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 29.5);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<f64, _> = no_wait(3)
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::Status(500))
            })
            .await;
        match result.unwrap_err() {
            UpstreamError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, UpstreamError::Status(500));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_attempt_returns_raw_error() {
        let result: Result<f64, _> = RetryPolicy::single_attempt()
            .execute(|| async { Err(UpstreamError::Decode("bad".into())) })
            .await;
        assert_eq!(result.unwrap_err(), UpstreamError::Decode("bad".into()));
    }

    #[tokio::test]
    async fn permanent_failures_fail_fast() {
        for permanent in [UpstreamError::Status(401), UpstreamError::Decode("no temp".into())] {
            let calls = AtomicUsize::new(0);
            let result: Result<f64, _> = no_wait(3)
                .execute(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(permanent.clone())
                })
                .await;
            assert_eq!(result.unwrap_err(), permanent);
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{:?} was retried", permanent);
        }
    }

    #[tokio::test]
    async fn custom_predicate_overrides_classification() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .base_delay(Duration::ZERO)
            .jitter(Jitter::None)
            .should_retry(|_| true)
            .build()
            .unwrap();
        let result: Result<f64, _> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::Status(404))
            })
            .await;
        assert!(matches!(result.unwrap_err(), UpstreamError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn circuit_open_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<f64, _> = no_wait(5)
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::CircuitOpen { failures: 5 })
            })
            .await;
        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts() {
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .base_delay(Duration::from_secs(2))
            .jitter(Jitter::None)
            .build()
            .unwrap();
        let start = tokio::time::Instant::now();
        let _: Result<f64, _> =
            policy.execute(|| async { Err(UpstreamError::Status(502)) }).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2 + 4), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(7), "waited {:?}", waited);
    }
}
