//! Rate limiting primitives.
//!
//! This module provides the building blocks for per-client admission control:
//! - [`RateLimiter`]: the core trait, keyed by client identifier.
//! - [`FixedWindow`]: fixed-window counting per key (in `strategies`).
//! - [`WindowStore`]: where the per-key windows live (in `store`); the in-memory store is
//!   sharded so different clients do not contend on one lock.
//! - [`RateLimitLayer`]: tower middleware keyed by the peer IP address.
//!
//! There is no queueing: a request over the limit is rejected immediately.

use crate::error::ConfigError;
use std::time::Duration;

pub mod middleware;
pub mod store;
pub mod strategies;
pub use middleware::{RateLimitLayer, RateLimitService};
pub use store::{InMemoryWindowStore, RateWindow, WindowHit, WindowStore};
pub use strategies::FixedWindow;

/// Name of the policy guarding the brew endpoint.
pub const BREW_POLICY_NAME: &str = "brew-fixed-window";
/// Requests admitted per client per window on the brew endpoint.
pub const BREW_PERMIT_LIMIT: u32 = 10;
/// Window length of the brew policy.
pub const BREW_WINDOW: Duration = Duration::from_secs(60);

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Permits left in the current window.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
    },
    /// The request is rejected.
    Denied {
        /// Time until the current window closes.
        /// Useful for `Retry-After` headers.
        wait: Duration,
        /// Name of the policy that rejected the request.
        reason: String,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Fixed-window limits: `permit_limit` requests per `window`, per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    permit_limit: u32,
    window: Duration,
}

impl WindowPolicy {
    /// Errors if `permit_limit` or `window` is zero.
    pub fn new(permit_limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if permit_limit == 0 {
            return Err(ConfigError::InvalidPermitLimit(permit_limit));
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidWindow);
        }
        Ok(Self { permit_limit, window })
    }

    /// The brew endpoint policy: 10 requests per minute.
    pub fn brew_default() -> Self {
        Self { permit_limit: BREW_PERMIT_LIMIT, window: BREW_WINDOW }
    }

    pub fn permit_limit(&self) -> u32 {
        self.permit_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::brew_default()
    }
}

/// Core interface for keyed rate limiting logic.
///
/// This trait decouples the middleware from the algorithm and from where the counters live.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Attempt to acquire `permits` for the client identified by `key`.
    async fn acquire(
        &self,
        key: &str,
        permits: u32,
    ) -> Result<Decision, Box<dyn std::error::Error + Send + Sync>>;
}
