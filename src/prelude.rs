//! Convenient re-exports for common brewhouse types.
pub use crate::{
    cache::TemperatureCache,
    clock::{Clock, ManualClock, SystemClock},
    drink::{Drink, DrinkKind, DrinkMenu},
    error::{BrewError, ConfigError, UpstreamError},
    machine::{BrewMachine, MachineState, SharedMachine},
    orchestrator::{BrewOutcome, Brewer, SpecialDate},
    rate_limit::{Decision, FixedWindow, InMemoryWindowStore, RateLimitLayer, RateLimiter, WindowPolicy},
    resilience::{CircuitBreaker, ResilientSource, RetryPolicy, UpstreamPolicy},
    weather::{OpenWeatherClient, TemperatureSource},
};
