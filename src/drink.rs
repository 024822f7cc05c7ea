//! Drink menu: the lookup table the machine brews from.

use crate::error::BrewError;
use std::collections::HashMap;
use std::fmt;

/// The kinds of drink a machine can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrinkKind {
    HotCoffee,
    IcedCoffee,
    Tea,
}

impl DrinkKind {
    /// Message served with the standard recipe.
    pub fn standard_message(self) -> &'static str {
        match self {
            DrinkKind::HotCoffee => "Your piping hot coffee is ready",
            DrinkKind::IcedCoffee => "Your refreshing iced coffee is ready",
            DrinkKind::Tea => "Your mellow tea is ready",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrinkKind::HotCoffee => "hot coffee",
            DrinkKind::IcedCoffee => "iced coffee",
            DrinkKind::Tea => "tea",
        };
        f.write_str(name)
    }
}

/// A produced drink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drink {
    kind: DrinkKind,
    message: &'static str,
}

impl Drink {
    pub fn kind(&self) -> DrinkKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

/// Recipes keyed by drink kind. Asking for a kind that is not on the menu is an error.
#[derive(Debug, Clone)]
pub struct DrinkMenu {
    recipes: HashMap<DrinkKind, &'static str>,
}

impl DrinkMenu {
    /// Menu with no recipes; add them with [`DrinkMenu::with_recipe`].
    pub fn empty() -> Self {
        Self { recipes: HashMap::new() }
    }

    /// Every drink kind with its standard message.
    pub fn standard() -> Self {
        [DrinkKind::HotCoffee, DrinkKind::IcedCoffee, DrinkKind::Tea]
            .into_iter()
            .fold(Self::empty(), |menu, kind| menu.with_recipe(kind, kind.standard_message()))
    }

    pub fn with_recipe(mut self, kind: DrinkKind, message: &'static str) -> Self {
        self.recipes.insert(kind, message);
        self
    }

    pub fn without(mut self, kind: DrinkKind) -> Self {
        self.recipes.remove(&kind);
        self
    }

    pub fn offers(&self, kind: DrinkKind) -> bool {
        self.recipes.contains_key(&kind)
    }

    /// Produce a drink of `kind`.
    ///
    /// # Errors
    /// `BrewError::UnknownVariant` if the menu has no recipe for `kind`.
    pub fn brew(&self, kind: DrinkKind) -> Result<Drink, BrewError> {
        self.recipes
            .get(&kind)
            .map(|&message| Drink { kind, message })
            .ok_or(BrewError::UnknownVariant(kind))
    }
}

impl Default for DrinkMenu {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_menu_brews_every_kind() {
        let menu = DrinkMenu::standard();
        let hot = menu.brew(DrinkKind::HotCoffee).unwrap();
        assert_eq!(hot.kind(), DrinkKind::HotCoffee);
        assert_eq!(hot.message(), "Your piping hot coffee is ready");
        assert_eq!(menu.brew(DrinkKind::Tea).unwrap().message(), "Your mellow tea is ready");
        assert_eq!(
            menu.brew(DrinkKind::IcedCoffee).unwrap().message(),
            "Your refreshing iced coffee is ready"
        );
    }

    #[test]
    fn missing_recipe_is_unknown_variant() {
        let menu = DrinkMenu::standard().without(DrinkKind::IcedCoffee);
        assert!(!menu.offers(DrinkKind::IcedCoffee));
        match menu.brew(DrinkKind::IcedCoffee) {
            Err(BrewError::UnknownVariant(kind)) => assert_eq!(kind, DrinkKind::IcedCoffee),
            other => panic!("expected UnknownVariant, got {:?}", other),
        }
    }

    #[test]
    fn custom_recipe_overrides_message() {
        let menu = DrinkMenu::empty().with_recipe(DrinkKind::Tea, "chai");
        assert_eq!(menu.brew(DrinkKind::Tea).unwrap().message(), "chai");
        assert!(menu.brew(DrinkKind::HotCoffee).is_err());
    }
}
