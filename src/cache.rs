//! Single-entry TTL cache in front of a [`TemperatureSource`].
//!
//! Entries expire at an absolute instant (`stored_at + ttl`, on the clock's monotonic reading);
//! reads never extend them. A read at or after `expires_at` is a miss. Failures are not cached and not retried here.
//!
//! Concurrent misses inside the same gap may each reach the upstream; the last successful
//! fetch wins.

use crate::clock::{millis, Clock};
use crate::error::UpstreamError;
use crate::weather::TemperatureSource;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Key the reading is cached under.
pub const CACHE_KEY: &str = "manila-weather-temp";
/// Lifetime of a cached reading.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheEntry {
    value: f64,
    expires_at: u64,
}

#[derive(Debug)]
pub struct TemperatureCache<S> {
    source: S,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl<S> TemperatureCache<S>
where
    S: TemperatureSource,
{
    pub fn new(source: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(source, DEFAULT_CACHE_TTL, clock)
    }

    pub fn with_ttl(source: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { source, ttl, clock, entry: RwLock::new(None) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it has not expired. Never contacts the upstream.
    pub fn peek(&self) -> Option<f64> {
        let now = self.clock.now_millis();
        let entry = *self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.filter(|e| now < e.expires_at).map(|e| e.value)
    }

    /// Drop the cached entry so the next `get` fetches.
    pub fn invalidate(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Return the cached reading, fetching it from the upstream on a miss.
    pub async fn get(&self) -> Result<f64, UpstreamError> {
        if let Some(value) = self.peek() {
            tracing::debug!(key = CACHE_KEY, value, "temperature cache hit");
            return Ok(value);
        }

        tracing::debug!(key = CACHE_KEY, "temperature cache miss");
        let value = self.source.temperature().await?;
        let expires_at = self.clock.now_millis().saturating_add(millis(self.ttl));
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) =
            Some(CacheEntry { value, expires_at });
        Ok(value)
    }
}

#[async_trait]
impl<S> TemperatureSource for TemperatureCache<S>
where
    S: TemperatureSource,
{
    async fn temperature(&self) -> Result<f64, UpstreamError> {
        self.get().await
    }
}
