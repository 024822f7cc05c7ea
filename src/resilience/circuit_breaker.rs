//! Consecutive-failure circuit breaker for the upstream lookup.
//!
//! - **Closed**: calls pass; `failure_threshold` consecutive failures open the circuit.
//! - **Open**: calls fail fast with `UpstreamError::CircuitOpen` until `break_duration` has
//!   elapsed on the injected clock's monotonic reading.
//! - **HalfOpen**: one probe call is let through. Success closes the circuit, failure reopens it.
//!
//! [`CircuitBreaker::acquire`] hands out a [`BreakerPermit`]. A probe permit dropped without an
//! outcome (the caller was cancelled) frees the probe slot for the next caller.
//!
//! Clones share state.

use crate::clock::{millis, Clock};
use crate::error::{ConfigError, UpstreamError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Current state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operating mode.
    Closed,
    /// Short-circuits calls until the break duration elapses.
    Open,
    /// The break elapsed; the next call probes the upstream.
    HalfOpen,
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: usize,
    opened_at: Option<u64>,
    probe_in_flight: bool,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_threshold: usize,
    break_duration: Duration,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    /// Errors if `failure_threshold` is zero or `break_duration` is zero.
    pub fn new(
        failure_threshold: usize,
        break_duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        if failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(0));
        }
        if break_duration.is_zero() {
            return Err(ConfigError::ZeroDuration("break_duration"));
        }
        Ok(Self {
            failure_threshold,
            break_duration,
            clock,
            state: Arc::new(Mutex::new(BreakerState::default())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn break_elapsed(&self, opened_at: u64) -> bool {
        self.clock.now_millis().saturating_sub(opened_at) >= millis(self.break_duration)
    }

    pub fn state(&self) -> CircuitState {
        let state = self.lock();
        match state.opened_at {
            None => CircuitState::Closed,
            Some(at) if self.break_elapsed(at) => CircuitState::HalfOpen,
            Some(_) => CircuitState::Open,
        }
    }

    /// Ask permission for one call.
    ///
    /// Report the outcome through the returned permit. Dropping it unreported is treated as
    /// "no outcome": counters are untouched and a held probe slot is released.
    pub fn acquire(&self) -> Result<BreakerPermit<'_>, UpstreamError> {
        let mut state = self.lock();
        let Some(opened_at) = state.opened_at else {
            return Ok(BreakerPermit { breaker: self, probe: false });
        };
        if self.break_elapsed(opened_at) && !state.probe_in_flight {
            state.probe_in_flight = true;
            tracing::info!("Circuit breaker → half-open");
            return Ok(BreakerPermit { breaker: self, probe: true });
        }
        Err(UpstreamError::CircuitOpen { failures: state.consecutive_failures })
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.opened_at.is_some() {
            tracing::info!("Circuit breaker → closed");
        }
        *state = BreakerState::default();
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_failures += 1;
        if state.opened_at.is_some() {
            state.opened_at = Some(self.clock.now_millis());
            state.probe_in_flight = false;
            tracing::warn!("Circuit breaker probe failed → open");
        } else if state.consecutive_failures >= self.failure_threshold {
            state.opened_at = Some(self.clock.now_millis());
            tracing::warn!(failures = state.consecutive_failures, "Circuit breaker → open");
        }
    }

    fn abandon_probe(&self) {
        let mut state = self.lock();
        if state.probe_in_flight {
            state.probe_in_flight = false;
            tracing::debug!("Circuit breaker probe abandoned; slot released");
        }
    }
}

/// Permission for one call through a [`CircuitBreaker`].
#[derive(Debug)]
#[must_use = "report the call's outcome with `success` or `failure`"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
}

impl BreakerPermit<'_> {
    /// Whether this call is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.probe = false;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.probe = false;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if self.probe {
            self.breaker.abandon_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{FixedOffset, TimeDelta, TimeZone};

    fn clock() -> ManualClock {
        ManualClock::new(FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap())
    }

    #[test]
    fn rejects_invalid_config() {
        let c = Arc::new(clock());
        assert_eq!(
            CircuitBreaker::new(0, Duration::from_secs(1), c.clone()).unwrap_err(),
            ConfigError::InvalidFailureThreshold(0)
        );
        assert!(CircuitBreaker::new(1, Duration::ZERO, c).is_err());
    }

    #[test]
    fn opens_after_threshold_and_fails_fast() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(5), Arc::new(clock())).unwrap();
        breaker.record_failure();
        assert!(breaker.acquire().is_ok());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.acquire().unwrap_err(), UpstreamError::CircuitOpen { failures: 2 });
    }

    #[test]
    fn success_resets_consecutive_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(5), Arc::new(clock())).unwrap();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_allows_single_probe_then_closes() {
        let clock = clock();
        let breaker = CircuitBreaker::new(1, Duration::from_secs(5), Arc::new(clock.clone())).unwrap();
        breaker.record_failure();
        clock.advance(Duration::from_secs(5));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let probe = breaker.acquire().unwrap();
        assert!(probe.is_probe());
        assert!(breaker.acquire().unwrap_err().is_circuit_open(), "only one probe at a time");

        probe.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.acquire().is_ok());
    }

    #[test]
    fn failed_probe_reopens() {
        let clock = clock();
        let breaker = CircuitBreaker::new(1, Duration::from_secs(5), Arc::new(clock.clone())).unwrap();
        breaker.record_failure();
        clock.advance(Duration::from_secs(6));
        breaker.acquire().unwrap().failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        clock.advance(Duration::from_secs(4));
        assert!(breaker.acquire().is_err());
        clock.advance(Duration::from_secs(1));
        assert!(breaker.acquire().is_ok());
    }

    #[test]
    fn dropped_half_open_permit_frees_the_slot() {
        let clock = clock();
        let breaker = CircuitBreaker::new(1, Duration::from_secs(5), Arc::new(clock.clone())).unwrap();
        breaker.record_failure();
        clock.advance(Duration::from_secs(5));

        let probe = breaker.acquire().unwrap();
        assert!(breaker.acquire().is_err());
        drop(probe);

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let retry = breaker.acquire().expect("slot released by the dropped permit");
        assert!(retry.is_probe());
        retry.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn dropped_closed_permit_changes_nothing() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(5), Arc::new(clock())).unwrap();
        let permit = breaker.acquire().unwrap();
        assert!(!permit.is_probe());
        drop(permit);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn break_duration_ignores_wall_clock_steps() {
        let clock = clock();
        let breaker = CircuitBreaker::new(1, Duration::from_secs(5), Arc::new(clock.clone())).unwrap();
        breaker.record_failure();
        clock.set(clock.now() - TimeDelta::hours(1));
        clock.advance(Duration::from_secs(5));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
}
