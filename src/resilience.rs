//! Resilience around the upstream temperature lookup.
//!
//! Layering, outermost first: Retry → CircuitBreaker → per-attempt Timeout → source.
//! Each attempt asks the breaker for a permit, runs under the attempt timeout and reports
//! its outcome through the permit. Only transient failures are retried. Retries happen here and nowhere else; the cache and the
//! orchestrator are single-attempt.

use crate::clock::Clock;
use crate::error::{ConfigError, UpstreamError};
use crate::weather::TemperatureSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{BreakerPermit, CircuitBreaker, CircuitState};
pub use retry::{Jitter, RetryPolicy, RetryPolicyBuilder};

/// Time budget for one upstream attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
/// Consecutive failures before the breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 5;
/// How long the breaker stays open before probing.
pub const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(5);

/// The policies applied to every upstream lookup.
#[derive(Debug, Clone)]
pub struct UpstreamPolicy {
    attempt_timeout: Duration,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl UpstreamPolicy {
    /// Errors if `attempt_timeout` is zero.
    pub fn new(
        attempt_timeout: Duration,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> Result<Self, ConfigError> {
        if attempt_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("attempt_timeout"));
        }
        Ok(Self { attempt_timeout, retry, breaker })
    }

    /// Deployed defaults: 10s per attempt, 3 attempts with jittered exponential backoff,
    /// breaker opening after 5 consecutive failures for 5s.
    pub fn standard(clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        Self::new(
            DEFAULT_ATTEMPT_TIMEOUT,
            RetryPolicy::builder().build()?,
            CircuitBreaker::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_BREAK_DURATION, clock)?,
        )
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn attempt<S>(&self, source: &S) -> Result<f64, UpstreamError>
    where
        S: TemperatureSource + ?Sized,
    {
        let permit = self.breaker.acquire()?;
        let outcome = match tokio::time::timeout(self.attempt_timeout, source.temperature()).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.attempt_timeout)),
        };
        match &outcome {
            Ok(_) => permit.success(),
            Err(_) => permit.failure(),
        }
        outcome
    }
}

/// A [`TemperatureSource`] guarded by an [`UpstreamPolicy`].
#[derive(Debug, Clone)]
pub struct ResilientSource<S> {
    inner: S,
    policy: UpstreamPolicy,
}

impl<S> ResilientSource<S> {
    pub fn new(inner: S, policy: UpstreamPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &UpstreamPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S> TemperatureSource for ResilientSource<S>
where
    S: TemperatureSource,
{
    async fn temperature(&self) -> Result<f64, UpstreamError> {
        self.policy.retry.execute(|| self.policy.attempt(&self.inner)).await
    }
}
