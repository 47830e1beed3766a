//! Core domain types for the BAC tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Beverage kinds and recorded drinks
//! - Session totals and per-day records
//! - Derived totals handed to views

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Beverage Types
// ============================================================================

/// Known beverage category
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DrinkKind {
    Beer,
    Wine,
    Vodka,
    Whisky,
    Cocktail,
    Champagne,
}

impl DrinkKind {
    pub const ALL: [DrinkKind; 6] = [
        DrinkKind::Beer,
        DrinkKind::Wine,
        DrinkKind::Vodka,
        DrinkKind::Whisky,
        DrinkKind::Cocktail,
        DrinkKind::Champagne,
    ];

    /// Machine name, as used in config files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            DrinkKind::Beer => "beer",
            DrinkKind::Wine => "wine",
            DrinkKind::Vodka => "vodka",
            DrinkKind::Whisky => "whisky",
            DrinkKind::Cocktail => "cocktail",
            DrinkKind::Champagne => "champagne",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            DrinkKind::Beer => "Beer",
            DrinkKind::Wine => "Wine",
            DrinkKind::Vodka => "Vodka",
            DrinkKind::Whisky => "Whisky",
            DrinkKind::Cocktail => "Cocktail",
            DrinkKind::Champagne => "Champagne",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DrinkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        DrinkKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| Error::invalid(format!("unknown drink kind: {}", s)))
    }
}

// ============================================================================
// Ledger Types
// ============================================================================

/// A single recorded drink.
///
/// Created by the ledger only; never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEntry {
    #[serde(rename = "drink")]
    kind: DrinkKind,
    #[serde(rename = "amount")]
    volume_ml: u32,
    #[serde(rename = "strength")]
    strength_percent: f64,
    #[serde(rename = "timestamp")]
    timestamp_ms: i64,
    #[serde(rename = "alcoholGrams")]
    alcohol_grams: f64,
}

impl DrinkEntry {
    pub(crate) fn new(
        kind: DrinkKind,
        volume_ml: u32,
        strength_percent: f64,
        timestamp_ms: i64,
        alcohol_grams: f64,
    ) -> Self {
        Self {
            kind,
            volume_ml,
            strength_percent,
            timestamp_ms,
            alcohol_grams,
        }
    }

    pub fn kind(&self) -> DrinkKind {
        self.kind
    }

    pub fn volume_ml(&self) -> u32 {
        self.volume_ml
    }

    pub fn strength_percent(&self) -> f64 {
        self.strength_percent
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn alcohol_grams(&self) -> f64 {
        self.alcohol_grams
    }
}

/// Running totals of the current sobriety session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    /// Sum of ethanol grams over every retained entry
    pub total_alcohol_grams: f64,
    /// Sum of beverage volume over every retained entry
    pub total_amount_ml: u64,
    /// Timestamp of the first drink of the session; 0 means no active session
    pub first_drink_timestamp_ms: i64,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        self.first_drink_timestamp_ms != 0
    }
}

/// Everything drunk on one local calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// Local day key, `YYYY-MM-DD`
    pub date: String,
    pub total_amount: u64,
    pub total_alcohol: f64,
    /// Entries in insertion order
    pub drinks: Vec<DrinkEntry>,
}

impl DailyRecord {
    pub(crate) fn empty(date: String) -> Self {
        Self {
            date,
            total_amount: 0,
            total_alcohol: 0.0,
            drinks: Vec::new(),
        }
    }
}

/// Volume and ethanol totals for one day
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DailyTotal {
    pub amount_ml: u64,
    pub alcohol_grams: f64,
}
