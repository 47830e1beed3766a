//! Physiological profile and profile-change notification.
//!
//! A [`Profile`] is an immutable value: it is validated once at the input
//! boundary and replaced wholesale on save. Components that must react to
//! a new profile register with a [`ProfileHub`].

use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 200.0;

/// Canonical elimination rates in ‰ per hour
pub const MALE_ELIMINATION_RATE: f64 = 0.15;
pub const FEMALE_ELIMINATION_RATE: f64 = 0.13;

/// Rates at or below this are treated as unset and replaced by the default
pub const MIN_ELIMINATION_RATE: f64 = 0.01;

/// Widmark distribution ratios
pub const MALE_DISTRIBUTION_FACTOR: f64 = 0.7;
pub const FEMALE_DISTRIBUTION_FACTOR: f64 = 0.6;

/// Per-user physiological parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(rename = "weight")]
    weight_kg: f64,
    #[serde(rename = "isMale")]
    is_male: bool,
    #[serde(rename = "metabolism", default)]
    elimination_rate_per_hour: f64,
    #[serde(rename = "createdDate", default = "today")]
    created_date: NaiveDate,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Sex-based default elimination rate
pub fn default_elimination_rate(is_male: bool) -> f64 {
    if is_male {
        MALE_ELIMINATION_RATE
    } else {
        FEMALE_ELIMINATION_RATE
    }
}

fn check_weight(weight_kg: f64) -> Result<()> {
    if weight_kg.is_finite() && (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&weight_kg) {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "weight must be between {} and {} kg, got {}",
            MIN_WEIGHT_KG, MAX_WEIGHT_KG, weight_kg
        )))
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            is_male: true,
            elimination_rate_per_hour: MALE_ELIMINATION_RATE,
            created_date: today(),
        }
    }
}

impl Profile {
    /// Build a profile from user-entered values
    ///
    /// Weight outside [30, 200] kg and non-positive rates are rejected.
    /// A positive rate at or below 0.01 ‰/h is replaced by the sex default.
    pub fn new(
        weight_kg: f64,
        is_male: bool,
        elimination_rate_per_hour: f64,
        created_date: NaiveDate,
    ) -> Result<Self> {
        if !(elimination_rate_per_hour.is_finite() && elimination_rate_per_hour > 0.0) {
            return Err(Error::invalid(format!(
                "elimination rate must be positive, got {} ‰/h",
                elimination_rate_per_hour
            )));
        }

        Self {
            weight_kg,
            is_male,
            elimination_rate_per_hour,
            created_date,
        }
        .validate()
    }

    /// Default profile for the given sex
    pub fn default_for(is_male: bool) -> Self {
        Self {
            is_male,
            elimination_rate_per_hour: default_elimination_rate(is_male),
            ..Self::default()
        }
    }

    /// Check the weight and repair an unset elimination rate
    pub fn validate(self) -> Result<Self> {
        check_weight(self.weight_kg)?;

        let mut profile = self;
        if !(profile.elimination_rate_per_hour.is_finite()
            && profile.elimination_rate_per_hour > MIN_ELIMINATION_RATE)
        {
            let repaired = default_elimination_rate(profile.is_male);
            tracing::warn!(
                "Elimination rate {} ‰/h is unset, using default {}",
                profile.elimination_rate_per_hour,
                repaired
            );
            profile.elimination_rate_per_hour = repaired;
        }
        Ok(profile)
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn is_male(&self) -> bool {
        self.is_male
    }

    /// Elimination rate in ‰ per hour
    pub fn elimination_rate_per_hour(&self) -> f64 {
        self.elimination_rate_per_hour
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date
    }

    /// Widmark distribution ratio (dimensionless)
    pub fn distribution_factor(&self) -> f64 {
        if self.is_male {
            MALE_DISTRIBUTION_FACTOR
        } else {
            FEMALE_DISTRIBUTION_FACTOR
        }
    }

    pub fn metabolism_class(&self) -> MetabolismClass {
        MetabolismClass::of(self.elimination_rate_per_hour)
    }
}

/// Coarse description of an elimination rate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetabolismClass {
    Slow,
    BelowAverage,
    Average,
    AboveAverage,
    Fast,
}

impl MetabolismClass {
    pub fn of(rate_per_hour: f64) -> Self {
        if rate_per_hour < 0.12 {
            MetabolismClass::Slow
        } else if rate_per_hour < 0.14 {
            MetabolismClass::BelowAverage
        } else if rate_per_hour < 0.16 {
            MetabolismClass::Average
        } else if rate_per_hour < 0.18 {
            MetabolismClass::AboveAverage
        } else {
            MetabolismClass::Fast
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetabolismClass::Slow => "slow",
            MetabolismClass::BelowAverage => "below average",
            MetabolismClass::Average => "average",
            MetabolismClass::AboveAverage => "above average",
            MetabolismClass::Fast => "fast",
        }
    }
}

impl fmt::Display for MetabolismClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Change notification
// ============================================================================

/// Handle returned by [`ProfileHub::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Profile)>;

/// Registry of callbacks interested in profile replacement
#[derive(Default)]
pub struct ProfileHub {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl ProfileHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Profile) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Notify subscribers in subscription order
    pub fn publish(&mut self, profile: &Profile) {
        tracing::debug!("Publishing profile to {} subscribers", self.subscribers.len());
        for (_, callback) in self.subscribers.iter_mut() {
            callback(profile);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for ProfileHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileHub")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn test_default_profile() {
        let p = Profile::default();
        assert_eq!(p.weight_kg(), 70.0);
        assert!(p.is_male());
        assert_eq!(p.elimination_rate_per_hour(), 0.15);
        assert_eq!(p.distribution_factor(), 0.7);
    }

    #[test]
    fn test_female_defaults() {
        let p = Profile::default_for(false);
        assert_eq!(p.elimination_rate_per_hour(), 0.13);
        assert_eq!(p.distribution_factor(), 0.6);
    }

    #[test]
    fn test_weight_bounds_are_rejected_not_clamped() {
        assert!(matches!(
            Profile::new(29.9, true, 0.15, date()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Profile::new(200.1, true, 0.15, date()),
            Err(Error::InvalidInput(_))
        ));
        assert!(Profile::new(30.0, true, 0.15, date()).is_ok());
        assert!(Profile::new(200.0, false, 0.15, date()).is_ok());
    }

    #[test]
    fn test_non_positive_rate_rejected_at_boundary() {
        assert!(matches!(
            Profile::new(70.0, true, 0.0, date()),
            Err(Error::InvalidInput(_))
        ));
        assert!(Profile::new(70.0, true, -0.1, date()).is_err());
    }

    #[test]
    fn test_tiny_rate_repaired_to_sex_default() {
        let male = Profile::new(80.0, true, 0.005, date()).unwrap();
        assert_eq!(male.elimination_rate_per_hour(), 0.15);

        let female = Profile::new(60.0, false, 0.01, date()).unwrap();
        assert_eq!(female.elimination_rate_per_hour(), 0.13);
    }

    #[test]
    fn test_validate_repairs_zero_rate_from_storage() {
        let json = r#"{"weight": 65.0, "isMale": false, "metabolism": 0.0, "createdDate": "2025-01-01"}"#;
        let loaded: Profile = serde_json::from_str(json).unwrap();
        let p = loaded.validate().unwrap();
        assert_eq!(p.elimination_rate_per_hour(), 0.13);
        assert_eq!(p.weight_kg(), 65.0);
    }

    #[test]
    fn test_missing_rate_in_storage_is_repaired() {
        let json = r#"{"weight": 90.0, "isMale": true}"#;
        let loaded: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.validate().unwrap().elimination_rate_per_hour(), 0.15);
    }

    #[test]
    fn test_metabolism_class() {
        assert_eq!(MetabolismClass::of(0.10), MetabolismClass::Slow);
        assert_eq!(MetabolismClass::of(0.13), MetabolismClass::BelowAverage);
        assert_eq!(MetabolismClass::of(0.15), MetabolismClass::Average);
        assert_eq!(MetabolismClass::of(0.17), MetabolismClass::AboveAverage);
        assert_eq!(MetabolismClass::of(0.25), MetabolismClass::Fast);
    }

    #[test]
    fn test_hub_notifies_in_order_and_unsubscribes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = ProfileHub::new();

        let s1 = seen.clone();
        let first = hub.subscribe(move |p| s1.borrow_mut().push(("first", p.weight_kg())));
        let s2 = seen.clone();
        hub.subscribe(move |p| s2.borrow_mut().push(("second", p.weight_kg())));

        let p = Profile::new(82.0, true, 0.15, date()).unwrap();
        hub.publish(&p);
        assert_eq!(
            *seen.borrow(),
            vec![("first", 82.0), ("second", 82.0)]
        );

        assert!(hub.unsubscribe(first));
        assert!(!hub.unsubscribe(first));
        hub.publish(&p);
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(hub.len(), 1);
    }
}
