//! Wiring: turns a [`BrewConfig`] into the running components.
//!
//! Upstream stack, outermost first: `TemperatureCache` → `ResilientSource` → `OpenWeatherClient`.
//! Cache hits never touch the resilience layer; misses go through retry, breaker and timeout.

use crate::cache::TemperatureCache;
use crate::clock::Clock;
use crate::config::BrewConfig;
use crate::drink::DrinkMenu;
use crate::error::ConfigError;
use crate::machine::BrewMachine;
use crate::orchestrator::Brewer;
use crate::rate_limit::{FixedWindow, InMemoryWindowStore};
use crate::resilience::{CircuitBreaker, ResilientSource, RetryPolicy, UpstreamPolicy};
use crate::weather::{OpenWeatherClient, WeatherConfig};
use axum::Router;
use std::sync::Arc;

pub type BrewLimiter = FixedWindow<InMemoryWindowStore>;

/// Everything a service instance owns.
pub struct BrewApp {
    pub brewer: Arc<Brewer>,
    pub limiter: Arc<BrewLimiter>,
}

impl BrewApp {
    pub fn from_config(config: &BrewConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let weather = OpenWeatherClient::new(WeatherConfig {
            base_url: config.weather_url.clone(),
            location: config.weather_location.clone(),
            api_key: config.weather_api_key.clone(),
        });

        let upstream = &config.upstream;
        let policy = UpstreamPolicy::new(
            upstream.attempt_timeout,
            RetryPolicy::builder()
                .max_attempts(upstream.max_attempts)
                .base_delay(upstream.base_delay)
                .max_delay(upstream.max_delay)
                .build()?,
            CircuitBreaker::new(upstream.failure_threshold, upstream.break_duration, clock.clone())?,
        )?;

        let cache = TemperatureCache::with_ttl(
            ResilientSource::new(weather, policy),
            config.cache_ttl,
            clock.clone(),
        );

        let machine = BrewMachine::new(DrinkMenu::standard(), config.brew_limit)?.into_shared();
        let brewer = Brewer::builder(machine, Arc::new(cache))
            .clock(clock.clone())
            .special_date(config.special_date)
            .hot_threshold(config.hot_threshold_celsius)
            .build();

        let limiter = FixedWindow::new(InMemoryWindowStore::new(), config.rate_limit, clock);

        Ok(Self { brewer: Arc::new(brewer), limiter: Arc::new(limiter) })
    }

    pub fn router(&self) -> Router {
        crate::http::router(self.brewer.clone(), self.limiter.clone())
    }
}
