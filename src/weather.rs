//! Upstream temperature source.
//!
//! [`TemperatureSource`] is the seam the orchestrator depends on. The production
//! implementation is [`OpenWeatherClient`]; [`crate::cache::TemperatureCache`] and
//! [`crate::resilience::ResilientSource`] decorate any source.

use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
/// Default location the brew temperature is read for.
pub const DEFAULT_LOCATION: &str = "Manila,PH";

/// Something that can report the current temperature in degrees Celsius.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn temperature(&self) -> Result<f64, UpstreamError>;
}

#[async_trait]
impl<T> TemperatureSource for Arc<T>
where
    T: TemperatureSource + ?Sized,
{
    async fn temperature(&self) -> Result<f64, UpstreamError> {
        (**self).temperature().await
    }
}

/// Connection details for the OpenWeatherMap API.
#[derive(Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub location: String,
    pub api_key: String,
}

impl WeatherConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("base_url", &self.base_url)
            .field("location", &self.location)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

/// Current-weather lookup against OpenWeatherMap, in metric units.
///
/// Single attempt per call: no retries, no timeout. Wrap it in
/// [`crate::resilience::ResilientSource`] for those.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl OpenWeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS roots, pooling).
    pub fn with_http_client(http: reqwest::Client, config: WeatherConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }
}

#[async_trait]
impl TemperatureSource for OpenWeatherClient {
    async fn temperature(&self) -> Result<f64, UpstreamError> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("q", self.config.location.as_str()),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), location = %self.config.location, "weather lookup rejected");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: CurrentWeather =
            response.json().await.map_err(|e| UpstreamError::Decode(e.to_string()))?;
        tracing::debug!(location = %self.config.location, temp = body.main.temp, "weather lookup ok");
        Ok(body.main.temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let cfg = WeatherConfig::new("secret-key");
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("Manila,PH"));
    }

    #[test]
    fn parses_openweather_payload() {
        let raw = r#"{"coord":{"lon":120.98,"lat":14.6},"main":{"temp":31.4,"humidity":70},"name":"Manila"}"#;
        let parsed: CurrentWeather = serde_json::from_str(raw).unwrap();
        assert!((parsed.main.temp - 31.4).abs() < f64::EPSILON);
    }
}
