//! Error types for the brew service.
//!
//! Only genuine failures live here. A depleted machine and a rate-limit rejection are
//! ordinary outcomes (`BrewOutcome::Unavailable`, `Decision::Denied`), not errors.
use crate::drink::DrinkKind;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by [`crate::Brewer::handle_request`].
#[derive(Debug, Clone, Error)]
pub enum BrewError {
    /// The drink menu has no recipe for the requested kind.
    #[error("no recipe configured for {0}")]
    UnknownVariant(DrinkKind),
    /// The temperature reading could not be obtained.
    #[error("temperature source unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
}

impl BrewError {
    /// Check if this error came from the upstream temperature source.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

/// Failures of the upstream temperature lookup and the policies wrapped around it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("request failed: {0}")]
    Request(String),
    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    /// The body did not contain a readable temperature.
    #[error("malformed upstream response: {0}")]
    Decode(String),
    /// A single attempt exceeded its time budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    /// The circuit breaker is rejecting calls.
    #[error("circuit breaker open ({failures} consecutive failures)")]
    CircuitOpen { failures: usize },
    /// Every attempt failed.
    #[error("retry exhausted after {attempts} attempts; last error: {last}")]
    RetriesExhausted { attempts: usize, last: Box<UpstreamError> },
}

impl UpstreamError {
    /// Check if this error is due to a timed-out attempt
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this error is due to the circuit breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether another attempt might succeed: transport errors, timeouts, and HTTP 408, 429
    /// or 5xx. Other 4xx answers, undecodable bodies and an open breaker are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Status(code) => matches!(code, 408 | 429 | 500..=599),
            Self::Decode(_) | Self::CircuitOpen { .. } | Self::RetriesExhausted { .. } => false,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("brew limit must be > 0 (got {0})")]
    InvalidBrewLimit(u32),
    #[error("permit_limit must be > 0 (got {0})")]
    InvalidPermitLimit(u32),
    #[error("rate-limit window must be > 0")]
    InvalidWindow,
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    #[error("failure_threshold must be > 0 (got {0})")]
    InvalidFailureThreshold(usize),
    #[error("duration `{0}` must be non-zero")]
    ZeroDuration(&'static str),
    #[error("invalid special date {month:02}-{day:02}")]
    InvalidSpecialDate { month: u32, day: u32 },
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv { name: &'static str, value: String },
}
