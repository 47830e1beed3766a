//! BAC estimation engine.
//!
//! Linear Widmark model:
//!
//! ```text
//! peak  = grams / (weight_kg * r)
//! decay = elimination_rate * hours_since_first_drink
//! bac   = max(0, peak - decay)
//! ```
//!
//! BAC is expressed in ‰. Everything here is pure: the current time is
//! always passed in by the caller.

use crate::profile::Profile;
use crate::{Error, Result};
use std::fmt;

pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Below this BAC the projection reports "sober"
pub const SOBER_THRESHOLD: f64 = 0.05;

fn check_profile(profile: &Profile) -> Result<()> {
    if !(profile.weight_kg().is_finite() && profile.weight_kg() > 0.0) {
        return Err(Error::invalid(format!(
            "weight must be positive, got {} kg",
            profile.weight_kg()
        )));
    }
    check_rate(profile.elimination_rate_per_hour())
}

fn check_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "elimination rate must be positive, got {} ‰/h",
            rate
        )))
    }
}

/// BAC right after absorption, before any elimination
pub fn peak_bac(total_alcohol_grams: f64, profile: &Profile) -> Result<f64> {
    check_profile(profile)?;
    Ok(total_alcohol_grams.max(0.0) / (profile.weight_kg() * profile.distribution_factor()))
}

/// Hours since the session started; 0 with no active session
pub fn elapsed_hours(first_drink_timestamp_ms: i64, now_ms: i64) -> f64 {
    if first_drink_timestamp_ms == 0 {
        return 0.0;
    }
    // A clock behind the session start counts as no time elapsed
    (now_ms.saturating_sub(first_drink_timestamp_ms)).max(0) as f64 / MS_PER_HOUR
}

/// Instantaneous BAC in ‰
pub fn evaluate(
    total_alcohol_grams: f64,
    profile: &Profile,
    first_drink_timestamp_ms: i64,
    now_ms: i64,
) -> Result<f64> {
    let peak = peak_bac(total_alcohol_grams, profile)?;
    let decay =
        profile.elimination_rate_per_hour() * elapsed_hours(first_drink_timestamp_ms, now_ms);
    Ok((peak - decay).max(0.0))
}

// ============================================================================
// Status
// ============================================================================

/// Intoxication category, ordered by severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intoxication {
    Sober,
    LightRelaxation,
    LightIntoxication,
    ModerateIntoxication,
    StrongIntoxication,
    DangerousIntoxication,
    Critical,
}

/// Upper bounds (exclusive), checked low to high
const STATUS_THRESHOLDS: [(f64, Intoxication); 6] = [
    (0.3, Intoxication::Sober),
    (0.5, Intoxication::LightRelaxation),
    (1.0, Intoxication::LightIntoxication),
    (1.5, Intoxication::ModerateIntoxication),
    (2.0, Intoxication::StrongIntoxication),
    (3.0, Intoxication::DangerousIntoxication),
];

impl Intoxication {
    pub fn label(&self) -> &'static str {
        match self {
            Intoxication::Sober => "sober",
            Intoxication::LightRelaxation => "light relaxation",
            Intoxication::LightIntoxication => "light intoxication",
            Intoxication::ModerateIntoxication => "moderate intoxication",
            Intoxication::StrongIntoxication => "strong intoxication",
            Intoxication::DangerousIntoxication => "dangerous intoxication",
            Intoxication::Critical => "critical - medical emergency",
        }
    }

    /// 0 (sober) to 6 (critical)
    pub fn severity(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Intoxication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categorize a BAC value
pub fn status(bac: f64) -> Intoxication {
    STATUS_THRESHOLDS
        .iter()
        .find(|(upper, _)| bac < *upper)
        .map(|(_, level)| *level)
        .unwrap_or(Intoxication::Critical)
}

// ============================================================================
// Sober-time projection
// ============================================================================

/// Presentation hint attached to high projections
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advisory {
    DoNotDrive,
    SeekEmergencyCare,
    UrgentMedical,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::DoNotDrive => "Do not drive!",
            Advisory::SeekEmergencyCare => "Dangerous! Call emergency services.",
            Advisory::UrgentMedical => "DANGER! Seek medical help immediately.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoberEstimate {
    /// Hours until the decay term consumes the current BAC
    pub hours: f64,
    pub advisory: Option<Advisory>,
}

impl SoberEstimate {
    pub fn is_sober(&self) -> bool {
        self.hours == 0.0
    }

    /// Whole hours and remaining whole minutes
    pub fn hours_minutes(&self) -> (u64, u64) {
        let hours = self.hours.trunc();
        let minutes = ((self.hours - hours) * 60.0).trunc();
        (hours as u64, minutes as u64)
    }

    /// Epoch milliseconds at which the projection reaches zero
    pub fn sober_at_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_add((self.hours * MS_PER_HOUR).round() as i64)
    }
}

/// Project the time to sobriety from the current BAC
pub fn time_to_sober(bac: f64, elimination_rate_per_hour: f64) -> Result<SoberEstimate> {
    check_rate(elimination_rate_per_hour)?;

    if bac <= SOBER_THRESHOLD {
        return Ok(SoberEstimate {
            hours: 0.0,
            advisory: None,
        });
    }

    let advisory = if bac > 3.0 {
        Some(Advisory::UrgentMedical)
    } else if bac > 2.0 {
        Some(Advisory::SeekEmergencyCare)
    } else if bac > 1.0 {
        Some(Advisory::DoNotDrive)
    } else {
        None
    };

    Ok(SoberEstimate {
        hours: bac / elimination_rate_per_hour,
        advisory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::alcohol_grams;
    use chrono::NaiveDate;

    const T0: i64 = 1_741_600_000_000;
    const HOUR_MS: i64 = 3_600_000;

    fn male_70() -> Profile {
        Profile::new(70.0, true, 0.15, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).unwrap()
    }

    #[test]
    fn test_scenario_single_beer_peak() {
        let grams = alcohol_grams(500.0, 5.0).unwrap();
        let bac = evaluate(grams, &male_70(), T0, T0).unwrap();

        assert!((bac - 19.725 / 49.0).abs() < 1e-9);
        assert!((bac - 0.403).abs() < 1e-3);
        assert_eq!(status(bac), Intoxication::LightRelaxation);
    }

    #[test]
    fn test_scenario_two_hours_later() {
        let grams = alcohol_grams(500.0, 5.0).unwrap();
        let bac = evaluate(grams, &male_70(), T0, T0 + 2 * HOUR_MS).unwrap();

        assert!((bac - (19.725 / 49.0 - 0.30)).abs() < 1e-9);
        assert_eq!(status(bac), Intoxication::Sober);
    }

    #[test]
    fn test_no_session_means_no_decay() {
        let bac = evaluate(0.0, &male_70(), 0, T0).unwrap();
        assert_eq!(bac, 0.0);

        // elapsed is 0 without a session start even with alcohol recorded
        let peak = peak_bac(10.0, &male_70()).unwrap();
        assert_eq!(evaluate(10.0, &male_70(), 0, T0).unwrap(), peak);
    }

    #[test]
    fn test_clamped_at_zero() {
        let bac = evaluate(5.0, &male_70(), T0, T0 + 48 * HOUR_MS).unwrap();
        assert_eq!(bac, 0.0);
    }

    #[test]
    fn test_clock_before_session_start_does_not_raise_bac() {
        let peak = peak_bac(30.0, &male_70()).unwrap();
        let bac = evaluate(30.0, &male_70(), T0, T0 - HOUR_MS).unwrap();
        assert_eq!(bac, peak);
    }

    #[test]
    fn test_monotonically_non_increasing_in_time() {
        let profile = male_70();
        for grams in [0.0, 5.0, 19.725, 60.0, 250.0] {
            let mut previous = f64::INFINITY;
            for minutes in (0..24 * 60).step_by(7) {
                let now = T0 + minutes * 60_000;
                let bac = evaluate(grams, &profile, T0, now).unwrap();
                assert!(bac >= 0.0);
                assert!(bac <= previous, "BAC rose at {} min for {} g", minutes, grams);
                previous = bac;
            }
        }
    }

    #[test]
    fn test_female_distribution_gives_higher_peak() {
        let female = Profile::new(70.0, false, 0.13, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .unwrap();
        let m = peak_bac(20.0, &male_70()).unwrap();
        let f = peak_bac(20.0, &female).unwrap();
        assert!((f - 20.0 / 42.0).abs() < 1e-12);
        assert!(f > m);
    }

    #[test]
    fn test_rejects_non_physical_profile() {
        let zero_weight: Profile =
            serde_json::from_str(r#"{"weight": 0.0, "isMale": true, "metabolism": 0.15}"#).unwrap();
        assert!(matches!(
            evaluate(10.0, &zero_weight, T0, T0),
            Err(Error::InvalidInput(_))
        ));

        let zero_rate: Profile =
            serde_json::from_str(r#"{"weight": 70.0, "isMale": true, "metabolism": 0.0}"#).unwrap();
        assert!(evaluate(10.0, &zero_rate, T0, T0).is_err());
    }

    #[test]
    fn test_status_boundaries() {
        assert_eq!(status(0.0), Intoxication::Sober);
        assert_eq!(status(0.299), Intoxication::Sober);
        assert_eq!(status(0.3), Intoxication::LightRelaxation);
        assert_eq!(status(0.5), Intoxication::LightIntoxication);
        assert_eq!(status(1.0), Intoxication::ModerateIntoxication);
        assert_eq!(status(1.5), Intoxication::StrongIntoxication);
        assert_eq!(status(2.0), Intoxication::DangerousIntoxication);
        assert_eq!(status(3.0), Intoxication::Critical);
        assert_eq!(status(12.0), Intoxication::Critical);
    }

    #[test]
    fn test_status_contiguous_and_exhaustive() {
        let mut previous = status(0.0);
        let mut bac = 0.0;
        while bac < 5.0 {
            let current = status(bac);
            // severity never skips a level or goes back
            assert!(current.severity() == previous.severity()
                || current.severity() == previous.severity() + 1);
            previous = current;
            bac += 0.001;
        }
        assert_eq!(previous, Intoxication::Critical);
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(Intoxication::Sober.severity(), 0);
        assert_eq!(Intoxication::Critical.severity(), 6);
    }

    #[test]
    fn test_time_to_sober() {
        let estimate = time_to_sober(0.45, 0.15).unwrap();
        assert!((estimate.hours - 3.0).abs() < 1e-9);
        assert_eq!(estimate.advisory, None);
        assert_eq!(estimate.sober_at_ms(T0), T0 + 3 * HOUR_MS);

        let sober = time_to_sober(0.05, 0.15).unwrap();
        assert!(sober.is_sober());
        assert_eq!(sober.hours_minutes(), (0, 0));
    }

    #[test]
    fn test_time_to_sober_hours_minutes() {
        let estimate = time_to_sober(0.41375, 0.15).unwrap();
        // 2.7583 h
        assert_eq!(estimate.hours_minutes(), (2, 45));
    }

    #[test]
    fn test_advisories() {
        assert_eq!(time_to_sober(1.0, 0.15).unwrap().advisory, None);
        assert_eq!(
            time_to_sober(1.2, 0.15).unwrap().advisory,
            Some(Advisory::DoNotDrive)
        );
        assert_eq!(
            time_to_sober(2.5, 0.15).unwrap().advisory,
            Some(Advisory::SeekEmergencyCare)
        );
        assert_eq!(
            time_to_sober(3.5, 0.15).unwrap().advisory,
            Some(Advisory::UrgentMedical)
        );
    }

    #[test]
    fn test_time_to_sober_rejects_bad_rate() {
        assert!(matches!(
            time_to_sober(1.0, 0.0),
            Err(Error::InvalidInput(_))
        ));
    }
}
