//! Request orchestrator.
//!
//! Guards run in a fixed order and short-circuit:
//!
//! 1. **Special date** (April 1st by default): answer `Teapot`. Neither the machine nor the
//!    temperature source is touched.
//! 2. **Capacity**: a depleted machine is refilled and this request answers `Unavailable`;
//!    the next one brews.
//! 3. **Brew**: read the (cached) temperature, pick hot or iced coffee, dispense.
//!
//! Steps 2 and 3 run under the machine lock, so the state read and the dispense are one
//! critical section.

use crate::clock::{Clock, SystemClock};
use crate::drink::{Drink, DrinkKind};
use crate::error::{BrewError, ConfigError};
use crate::machine::{MachineSnapshot, MachineState, SharedMachine};
use crate::weather::TemperatureSource;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use std::sync::Arc;

/// Readings strictly above this (°C) get hot coffee; the rest get iced coffee.
pub const DEFAULT_HOT_THRESHOLD_CELSIUS: f64 = 30.0;

/// Format of the `prepared` timestamp: ISO-8601 seconds with the UTC offset.
pub const PREPARED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// A month/day pair matched against the local calendar in any year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialDate {
    month: u32,
    day: u32,
}

impl SpecialDate {
    pub const APRIL_FOOLS: SpecialDate = SpecialDate { month: 4, day: 1 };

    /// Errors if the pair is not a calendar day (Feb 29 is accepted).
    pub fn new(month: u32, day: u32) -> Result<Self, ConfigError> {
        NaiveDate::from_ymd_opt(2000, month, day)
            .map(|_| Self { month, day })
            .ok_or(ConfigError::InvalidSpecialDate { month, day })
    }

    pub fn matches(&self, at: &DateTime<FixedOffset>) -> bool {
        at.month() == self.month && at.day() == self.day
    }
}

impl Default for SpecialDate {
    fn default() -> Self {
        Self::APRIL_FOOLS
    }
}

/// Picks the drink from the current temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrinkSelector {
    hot_above: f64,
}

impl DrinkSelector {
    pub fn new(hot_above: f64) -> Self {
        Self { hot_above }
    }

    pub fn select(&self, celsius: f64) -> DrinkKind {
        if celsius > self.hot_above {
            DrinkKind::HotCoffee
        } else {
            DrinkKind::IcedCoffee
        }
    }
}

impl Default for DrinkSelector {
    fn default() -> Self {
        Self::new(DEFAULT_HOT_THRESHOLD_CELSIUS)
    }
}

/// A successful brew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewedDrink {
    pub drink: Drink,
    pub prepared: DateTime<FixedOffset>,
}

impl BrewedDrink {
    pub fn message(&self) -> &'static str {
        self.drink.message()
    }

    /// `prepared` rendered with [`PREPARED_FORMAT`], e.g. `2025-06-15T09:30:00+08:00`.
    pub fn prepared_string(&self) -> String {
        self.prepared.format(PREPARED_FORMAT).to_string()
    }
}

/// Result of one brew request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrewOutcome {
    Brewed(BrewedDrink),
    /// The machine was depleted; it has been refilled for the next request.
    Unavailable,
    /// Request made on the special date.
    Teapot,
}

impl BrewOutcome {
    pub fn is_brewed(&self) -> bool {
        matches!(self, Self::Brewed(_))
    }
}

pub struct Brewer {
    machine: SharedMachine,
    temperature: Arc<dyn TemperatureSource>,
    clock: Arc<dyn Clock>,
    special_date: SpecialDate,
    selector: DrinkSelector,
}

impl std::fmt::Debug for Brewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brewer")
            .field("clock", &self.clock)
            .field("special_date", &self.special_date)
            .field("selector", &self.selector)
            .field("temperature", &"<source>")
            .finish()
    }
}

impl Brewer {
    pub fn builder(
        machine: SharedMachine,
        temperature: Arc<dyn TemperatureSource>,
    ) -> BrewerBuilder {
        BrewerBuilder {
            machine,
            temperature,
            clock: Arc::new(SystemClock),
            special_date: SpecialDate::default(),
            selector: DrinkSelector::default(),
        }
    }

    /// Run the guards and, if they pass, brew one drink.
    ///
    /// # Errors
    /// `UpstreamUnavailable` if the temperature cannot be read, `UnknownVariant` if the menu
    /// lacks the selected drink. Neither consumes capacity.
    pub async fn handle_request(&self) -> Result<BrewOutcome, BrewError> {
        let now = self.clock.now();
        if self.special_date.matches(&now) {
            tracing::info!(date = %now.date_naive(), "special date; serving teapot");
            return Ok(BrewOutcome::Teapot);
        }

        let mut machine = self.machine.lock().await;
        if machine.state() == MachineState::Depleted {
            machine.refill();
            tracing::info!("machine was depleted; refilled for the next request");
            return Ok(BrewOutcome::Unavailable);
        }

        let celsius = self.temperature.temperature().await?;
        let kind = self.selector.select(celsius);
        let drink = machine.dispense(kind)?;
        drop(machine);

        tracing::debug!(celsius, %kind, "brewed");
        Ok(BrewOutcome::Brewed(BrewedDrink { drink, prepared: self.clock.now() }))
    }

    pub async fn force_deplete(&self) {
        self.machine.lock().await.force_deplete();
    }

    pub async fn refill(&self) {
        self.machine.lock().await.refill();
    }

    pub async fn snapshot(&self) -> MachineSnapshot {
        self.machine.lock().await.snapshot()
    }
}

/// Builder for [`Brewer`]. Defaults: system clock, April 1st, 30 °C threshold.
pub struct BrewerBuilder {
    machine: SharedMachine,
    temperature: Arc<dyn TemperatureSource>,
    clock: Arc<dyn Clock>,
    special_date: SpecialDate,
    selector: DrinkSelector,
}

impl BrewerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn special_date(mut self, date: SpecialDate) -> Self {
        self.special_date = date;
        self
    }

    pub fn hot_threshold(mut self, celsius: f64) -> Self {
        self.selector = DrinkSelector::new(celsius);
        self
    }

    pub fn build(self) -> Brewer {
        Brewer {
            machine: self.machine,
            temperature: self.temperature,
            clock: self.clock,
            special_date: self.special_date,
            selector: self.selector,
        }
    }
}
