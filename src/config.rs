//! Service configuration.
//!
//! [`BrewConfig::default`] carries the deployed constants; [`BrewConfig::from_env`] overlays
//! the environment. Everything is validated when it is turned into components.

use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::ConfigError;
use crate::machine::DEFAULT_BREW_LIMIT;
use crate::orchestrator::{SpecialDate, DEFAULT_HOT_THRESHOLD_CELSIUS};
use crate::rate_limit::WindowPolicy;
use crate::resilience::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BREAK_DURATION, DEFAULT_FAILURE_THRESHOLD,
};
use crate::weather::{DEFAULT_LOCATION, DEFAULT_WEATHER_URL};
use std::net::SocketAddr;
use std::time::Duration;

pub const ENV_BIND: &str = "BREWHOUSE_BIND";
pub const ENV_API_KEY: &str = "OPENWEATHERMAP_API_KEY";
pub const ENV_LOCATION: &str = "BREWHOUSE_WEATHER_LOCATION";
pub const ENV_WEATHER_URL: &str = "BREWHOUSE_WEATHER_URL";
pub const ENV_RATE_LIMIT: &str = "BREWHOUSE_RATE_LIMIT";

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Upstream resilience knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub attempt_timeout: Duration,
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub failure_threshold: usize,
    pub break_duration: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            break_duration: DEFAULT_BREAK_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrewConfig {
    pub bind: SocketAddr,
    pub brew_limit: u32,
    pub rate_limit: WindowPolicy,
    pub cache_ttl: Duration,
    pub special_date: SpecialDate,
    pub hot_threshold_celsius: f64,
    pub weather_url: String,
    pub weather_location: String,
    /// Required at runtime; empty until loaded.
    pub weather_api_key: String,
    pub upstream: UpstreamConfig,
}

impl Default for BrewConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            brew_limit: DEFAULT_BREW_LIMIT,
            rate_limit: WindowPolicy::brew_default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            special_date: SpecialDate::APRIL_FOOLS,
            hot_threshold_celsius: DEFAULT_HOT_THRESHOLD_CELSIUS,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_location: DEFAULT_LOCATION.to_string(),
            weather_api_key: String::new(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl BrewConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BIND) {
            config.bind = raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: ENV_BIND, value: raw.clone() })?;
        }

        config.weather_api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(ENV_API_KEY))?;

        if let Some(location) = lookup(ENV_LOCATION) {
            config.weather_location = location;
        }
        if let Some(url) = lookup(ENV_WEATHER_URL) {
            config.weather_url = url;
        }
        if let Some(raw) = lookup(ENV_RATE_LIMIT) {
            let permits: u32 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: ENV_RATE_LIMIT, value: raw.clone() })?;
            config.rate_limit = WindowPolicy::new(permits, config.rate_limit.window())?;
        }

        Ok(config)
    }
}
