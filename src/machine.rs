//! Capacity state machine for the brew machine.
//!
//! ```text
//!            dispense reaches limit / force_deplete
//!   Ready ───────────────────────────────────────▶ Depleted
//!     ▲                                              │
//!     └──────────────────── refill ◀─────────────────┘
//! ```
//!
//! The machine trusts its caller: [`BrewMachine::dispense`] does not check the state first.
//! The orchestrator owns that guard and holds the [`SharedMachine`] lock across the
//! check-then-dispense span, so concurrent requests cannot overshoot the limit.

use crate::drink::{Drink, DrinkKind, DrinkMenu};
use crate::error::{BrewError, ConfigError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Brews per refill cycle for the deployed machine.
pub const DEFAULT_BREW_LIMIT: u32 = 4;

/// Handle to the single machine owned by a service instance.
pub type SharedMachine = Arc<Mutex<BrewMachine>>;

/// Operational state of a [`BrewMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// The machine can brew.
    Ready,
    /// The limit was reached; a refill is needed before the next brew.
    Depleted,
}

/// Point-in-time view of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub state: MachineState,
    pub usage_count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct BrewMachine {
    menu: DrinkMenu,
    usage_count: u32,
    limit: u32,
    state: MachineState,
}

impl BrewMachine {
    /// Create a machine in `Ready` with an empty usage counter.
    ///
    /// # Errors
    /// `ConfigError::InvalidBrewLimit` if `limit` is zero.
    pub fn new(menu: DrinkMenu, limit: u32) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::InvalidBrewLimit(limit));
        }
        Ok(Self { menu, usage_count: 0, limit, state: MachineState::Ready })
    }

    /// Wrap the machine in the shared, lock-guarded handle the orchestrator expects.
    pub fn into_shared(self) -> SharedMachine {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Brews left before the machine depletes itself.
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.usage_count)
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot { state: self.state, usage_count: self.usage_count, limit: self.limit }
    }

    /// Brew one drink, consuming one unit of capacity.
    ///
    /// The caller must have checked that the machine is `Ready`. Reaching the limit moves the
    /// machine to `Depleted`. A kind missing from the menu fails before any capacity is used.
    pub fn dispense(&mut self, kind: DrinkKind) -> Result<Drink, BrewError> {
        let drink = self.menu.brew(kind)?;
        self.usage_count = self.usage_count.saturating_add(1);
        if self.usage_count >= self.limit {
            self.state = MachineState::Depleted;
            tracing::info!(usage = self.usage_count, limit = self.limit, "Brew machine → depleted");
        }
        Ok(drink)
    }

    /// Mark the machine depleted regardless of its usage count.
    pub fn force_deplete(&mut self) {
        if self.state != MachineState::Depleted {
            tracing::info!(usage = self.usage_count, "Brew machine → depleted (forced)");
        }
        self.state = MachineState::Depleted;
    }

    /// Reset usage and return to `Ready`. No-op when already full.
    pub fn refill(&mut self) {
        if self.state == MachineState::Depleted || self.usage_count > 0 {
            tracing::info!(usage = self.usage_count, "Brew machine refilled");
        }
        self.usage_count = 0;
        self.state = MachineState::Ready;
    }
}

impl Default for BrewMachine {
    fn default() -> Self {
        Self {
            menu: DrinkMenu::standard(),
            usage_count: 0,
            limit: DEFAULT_BREW_LIMIT,
            state: MachineState::Ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ready_and_empty() {
        let machine = BrewMachine::default();
        assert_eq!(machine.state(), MachineState::Ready);
        assert_eq!(machine.usage_count(), 0);
        assert_eq!(machine.limit(), DEFAULT_BREW_LIMIT);
        assert_eq!(machine.remaining(), 4);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = BrewMachine::new(DrinkMenu::standard(), 0).unwrap_err();
        assert_eq!(err, ConfigError::InvalidBrewLimit(0));
    }

    #[test]
    fn depletes_exactly_at_limit() {
        let mut machine = BrewMachine::default();
        for n in 1..=6u32 {
            machine.dispense(DrinkKind::HotCoffee).unwrap();
            assert_eq!(machine.usage_count(), n);
            let expected =
                if n >= DEFAULT_BREW_LIMIT { MachineState::Depleted } else { MachineState::Ready };
            assert_eq!(machine.state(), expected, "after {} dispenses", n);
        }
    }

    #[test]
    fn dispense_returns_menu_drink() {
        let mut machine = BrewMachine::default();
        let drink = machine.dispense(DrinkKind::IcedCoffee).unwrap();
        assert_eq!(drink.message(), "Your refreshing iced coffee is ready");
    }

    #[test]
    fn unknown_variant_consumes_no_capacity() {
        let menu = DrinkMenu::standard().without(DrinkKind::IcedCoffee);
        let mut machine = BrewMachine::new(menu, 4).unwrap();
        let err = machine.dispense(DrinkKind::IcedCoffee).unwrap_err();
        assert!(matches!(err, BrewError::UnknownVariant(DrinkKind::IcedCoffee)));
        assert_eq!(machine.usage_count(), 0);
        assert_eq!(machine.state(), MachineState::Ready);
    }

    #[test]
    fn refill_resets_from_any_state() {
        let mut machine = BrewMachine::default();
        machine.refill();
        assert_eq!(machine.snapshot(), MachineSnapshot { state: MachineState::Ready, usage_count: 0, limit: 4 });

        machine.dispense(DrinkKind::Tea).unwrap();
        machine.refill();
        assert_eq!((machine.state(), machine.usage_count()), (MachineState::Ready, 0));

        for _ in 0..4 {
            machine.dispense(DrinkKind::Tea).unwrap();
        }
        assert_eq!(machine.state(), MachineState::Depleted);
        machine.refill();
        assert_eq!((machine.state(), machine.usage_count()), (MachineState::Ready, 0));
    }

    #[test]
    fn force_deplete_ignores_usage() {
        let mut machine = BrewMachine::default();
        machine.dispense(DrinkKind::Tea).unwrap();
        machine.force_deplete();
        assert_eq!(machine.state(), MachineState::Depleted);
        assert_eq!(machine.usage_count(), 1);
        machine.force_deplete();
        assert_eq!(machine.state(), MachineState::Depleted);
    }
}
