//! Unit conversions: beverage volume and strength to ethanol mass, body
//! weight units and BAC units.
//!
//! All functions are pure.

use crate::{Error, Result};

/// Density of ethanol in g/mL.
pub const ETHANOL_DENSITY: f64 = 0.789;

/// Kilograms per avoirdupois pound.
pub const KG_PER_LB: f64 = 0.453_592_37;

/// Grams of pure ethanol in `volume_ml` of a beverage at `strength_percent` ABV.
///
/// Fails with [`Error::InvalidInput`] when the volume is not positive or the
/// strength is outside (0, 100].
pub fn alcohol_grams(volume_ml: f64, strength_percent: f64) -> Result<f64> {
    if !(volume_ml.is_finite() && volume_ml > 0.0) {
        return Err(Error::invalid(format!(
            "volume must be positive, got {} mL",
            volume_ml
        )));
    }
    check_strength(strength_percent)?;

    Ok(volume_ml * strength_percent * ETHANOL_DENSITY / 100.0)
}

/// Validate an ABV percentage
pub fn check_strength(strength_percent: f64) -> Result<()> {
    if strength_percent.is_finite() && strength_percent > 0.0 && strength_percent <= 100.0 {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "strength must be in (0, 100] %, got {}",
            strength_percent
        )))
    }
}

pub fn kg_to_lb(kg: f64) -> f64 {
    kg / KG_PER_LB
}

pub fn lb_to_kg(lb: f64) -> f64 {
    lb * KG_PER_LB
}

/// ‰ (g/kg) to % BAC
pub fn permille_to_percent(permille: f64) -> f64 {
    permille / 10.0
}

/// % BAC to ‰ (g/kg)
pub fn percent_to_permille(percent: f64) -> f64 {
    percent * 10.0
}
