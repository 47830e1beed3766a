//! Default beverage catalog.
//!
//! Maps every [`DrinkKind`] to its typical strength. Config overrides are
//! applied on top of the cached defaults.

use crate::types::DrinkKind;
use crate::units::check_strength;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<BeverageCatalog> = Lazy::new(build_default_catalog);

/// A beverage and its alcohol strength
#[derive(Clone, Debug, PartialEq)]
pub struct Beverage {
    pub kind: DrinkKind,
    pub strength_percent: f64,
}

/// Strength lookup table for all known beverages
#[derive(Clone, Debug)]
pub struct BeverageCatalog {
    beverages: HashMap<DrinkKind, Beverage>,
}

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static BeverageCatalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with the built-in strengths
pub fn build_default_catalog() -> BeverageCatalog {
    let defaults = [
        (DrinkKind::Beer, 5.0),
        (DrinkKind::Wine, 12.0),
        (DrinkKind::Vodka, 40.0),
        (DrinkKind::Whisky, 40.0),
        (DrinkKind::Cocktail, 15.0),
        (DrinkKind::Champagne, 11.0),
    ];

    let beverages = defaults
        .into_iter()
        .map(|(kind, strength_percent)| {
            (
                kind,
                Beverage {
                    kind,
                    strength_percent,
                },
            )
        })
        .collect();

    BeverageCatalog { beverages }
}

impl BeverageCatalog {
    /// Strength (% ABV) of a beverage kind
    pub fn strength_of(&self, kind: DrinkKind) -> f64 {
        // Every kind is inserted by build_default_catalog
        self.beverages
            .get(&kind)
            .map(|b| b.strength_percent)
            .unwrap_or(0.0)
    }

    /// Return a copy of this catalog with strengths replaced by name
    ///
    /// Keys are drink names as accepted by [`DrinkKind::from_str`].
    pub fn with_overrides(&self, overrides: &HashMap<String, f64>) -> Result<Self> {
        let mut catalog = self.clone();
        for (name, strength) in overrides {
            let kind: DrinkKind = name
                .parse()
                .map_err(|_| Error::Config(format!("unknown drink in [drinks]: {}", name)))?;
            check_strength(*strength)
                .map_err(|e| Error::Config(format!("bad strength for {}: {}", name, e)))?;
            tracing::debug!("Overriding strength of {} to {}%", kind, strength);
            catalog.beverages.insert(
                kind,
                Beverage {
                    kind,
                    strength_percent: *strength,
                },
            );
        }
        Ok(catalog)
    }

    /// All beverages in declaration order
    pub fn beverages(&self) -> Vec<&Beverage> {
        DrinkKind::ALL
            .iter()
            .filter_map(|k| self.beverages.get(k))
            .collect()
    }
}
