#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # brewhouse ☕
//!
//! A capacity-limited brew service: a machine that brews four drinks per refill, an
//! orchestrator that guards it, a TTL cache over a weather lookup, and per-client fixed-window
//! rate limiting in front of it all.
//!
//! ## Components
//!
//! - **Brew machine** ([`BrewMachine`]): `Ready` / `Depleted` capacity state machine
//! - **Orchestrator** ([`Brewer`]): special-date guard → capacity guard → temperature → dispense
//! - **Temperature cache** ([`TemperatureCache`]): one entry, absolute 10 minute expiry
//! - **Upstream resilience** ([`ResilientSource`]): attempt timeout, retry, circuit breaker
//! - **Rate limiting** ([`rate_limit`]): fixed window per client IP, tower middleware
//!
//! ## Quick Start
//!
//! ```rust
//! use brewhouse::{BrewMachine, BrewOutcome, Brewer, TemperatureSource, UpstreamError};
//! use std::sync::Arc;
//!
//! struct Sunny;
//!
//! #[async_trait::async_trait]
//! impl TemperatureSource for Sunny {
//!     async fn temperature(&self) -> Result<f64, UpstreamError> {
//!         Ok(33.0)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let brewer = Brewer::builder(BrewMachine::default().into_shared(), Arc::new(Sunny)).build();
//!     match brewer.handle_request().await {
//!         Ok(BrewOutcome::Brewed(cup)) => println!("{} at {}", cup.message(), cup.prepared_string()),
//!         Ok(other) => println!("{:?}", other),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod adaptive;
pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod drink;
pub mod error;
pub mod http;
pub mod machine;
pub mod orchestrator;
pub mod prelude;
pub mod rate_limit;
pub mod resilience;
pub mod weather;

// Re-exports
pub use app::BrewApp;
pub use cache::TemperatureCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BrewConfig;
pub use drink::{Drink, DrinkKind, DrinkMenu};
pub use error::{BrewError, ConfigError, UpstreamError};
pub use machine::{BrewMachine, MachineSnapshot, MachineState, SharedMachine};
pub use orchestrator::{BrewOutcome, BrewedDrink, Brewer, BrewerBuilder, SpecialDate};
pub use rate_limit::{Decision, FixedWindow, InMemoryWindowStore, RateLimiter, WindowPolicy};
pub use resilience::{ResilientSource, UpstreamPolicy};
pub use weather::{OpenWeatherClient, TemperatureSource, WeatherConfig};
