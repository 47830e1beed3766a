//! Append-only drink ledger.
//!
//! The ledger owns every [`DrinkEntry`] (most recent first), the running
//! [`SessionState`] totals and the per-day grouping. Entries leave the
//! ledger only through [`DrinkLedger::reset_day`] or
//! [`DrinkLedger::reset_all`].

use crate::daily::{day_key, DailyAggregator};
use crate::types::{DrinkEntry, DrinkKind, SessionState};
use crate::{units, Error, Result};

/// Persisted totals may differ from the entry sum by this much before they
/// are re-derived
const TOTAL_TOLERANCE_GRAMS: f64 = 1e-6;

/// Result of a reset request
#[derive(Clone, Debug, PartialEq)]
pub enum ResetOutcome {
    Removed {
        entries: usize,
        amount_ml: u64,
        alcohol_grams: f64,
    },
    /// The requested day (or the whole ledger) held no drinks
    NothingToReset,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrinkLedger {
    entries: Vec<DrinkEntry>,
    session: SessionState,
    daily: DailyAggregator,
}

impl DrinkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts
    ///
    /// `entries` must be most recent first. Daily records are re-derived
    /// from the entries; totals that drifted from the entry sums are
    /// replaced.
    pub fn from_parts(
        entries: Vec<DrinkEntry>,
        total_alcohol_grams: f64,
        total_amount_ml: u64,
        first_drink_timestamp_ms: i64,
    ) -> Self {
        let entries: Vec<DrinkEntry> = entries
            .into_iter()
            .filter(|e| {
                let sane = e.volume_ml() > 0
                    && e.timestamp_ms() > 0
                    && e.alcohol_grams().is_finite()
                    && e.alcohol_grams() >= 0.0
                    && day_key(e.timestamp_ms()).is_ok();
                if !sane {
                    tracing::warn!("Dropping malformed stored entry: {:?}", e);
                }
                sane
            })
            .collect();

        let mut daily = DailyAggregator::new();
        for entry in entries.iter().rev() {
            // Timestamps were checked above
            let _ = daily.update(entry);
        }

        let grams_sum: f64 = entries.iter().map(|e| e.alcohol_grams()).sum();
        let amount_sum: u64 = entries.iter().map(|e| u64::from(e.volume_ml())).sum();

        let total_alcohol_grams = if (total_alcohol_grams - grams_sum).abs() > TOTAL_TOLERANCE_GRAMS
        {
            tracing::warn!(
                "Stored alcohol total {} g disagrees with entries ({} g), re-deriving",
                total_alcohol_grams,
                grams_sum
            );
            grams_sum
        } else {
            total_alcohol_grams
        };

        if total_amount_ml != amount_sum {
            tracing::warn!(
                "Stored volume total {} mL disagrees with entries ({} mL), re-deriving",
                total_amount_ml,
                amount_sum
            );
        }

        let first_drink_timestamp_ms = if entries.is_empty() {
            0
        } else if first_drink_timestamp_ms == 0 {
            let oldest = entries.iter().map(|e| e.timestamp_ms()).min().unwrap_or(0);
            tracing::warn!("Active ledger without session start, using {}", oldest);
            oldest
        } else {
            first_drink_timestamp_ms
        };

        Self {
            entries,
            session: SessionState {
                total_alcohol_grams,
                total_amount_ml: amount_sum,
                first_drink_timestamp_ms,
            },
            daily,
        }
    }

    /// Record a drink
    ///
    /// The first drink recorded into an empty ledger starts the session.
    pub fn record(
        &mut self,
        kind: DrinkKind,
        volume_ml: i64,
        strength_percent: f64,
        timestamp_ms: i64,
    ) -> Result<DrinkEntry> {
        if volume_ml <= 0 {
            return Err(Error::invalid(format!(
                "volume must be positive, got {} mL",
                volume_ml
            )));
        }
        let volume = u32::try_from(volume_ml)
            .map_err(|_| Error::invalid(format!("volume too large: {} mL", volume_ml)))?;
        if timestamp_ms <= 0 {
            return Err(Error::invalid(format!(
                "timestamp must be after the epoch, got {}",
                timestamp_ms
            )));
        }

        let alcohol_grams = units::alcohol_grams(f64::from(volume), strength_percent)?;
        let entry = DrinkEntry::new(kind, volume, strength_percent, timestamp_ms, alcohol_grams);

        // Only fails on an unrepresentable timestamp, before any state changes
        self.daily.update(&entry)?;

        if self.entries.is_empty() {
            self.session.first_drink_timestamp_ms = timestamp_ms;
            tracing::info!("Session started at {}", timestamp_ms);
        }
        self.entries.insert(0, entry.clone());
        self.session.total_alcohol_grams += alcohol_grams;
        self.session.total_amount_ml += u64::from(volume);

        tracing::debug!(
            "Recorded {} mL {} ({:.3} g), session total {:.3} g",
            volume,
            kind,
            alcohol_grams,
            self.session.total_alcohol_grams
        );
        Ok(entry)
    }

    /// Remove every entry of one local day
    pub fn reset_day(&mut self, date_key: &str) -> ResetOutcome {
        let (removed, kept): (Vec<DrinkEntry>, Vec<DrinkEntry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| day_key(e.timestamp_ms()).map_or(false, |k| k == date_key));
        self.entries = kept;
        self.daily.remove(date_key);

        if removed.is_empty() {
            tracing::info!("Nothing to reset for {}", date_key);
            return ResetOutcome::NothingToReset;
        }

        let alcohol_grams: f64 = removed.iter().map(|e| e.alcohol_grams()).sum();
        let amount_ml: u64 = removed.iter().map(|e| u64::from(e.volume_ml())).sum();

        if self.entries.is_empty() {
            self.session = SessionState::default();
        } else {
            self.session.total_alcohol_grams =
                (self.session.total_alcohol_grams - alcohol_grams).max(0.0);
            self.session.total_amount_ml = self.session.total_amount_ml.saturating_sub(amount_ml);
        }

        tracing::info!(
            "Reset {}: removed {} entries ({} mL, {:.3} g)",
            date_key,
            removed.len(),
            amount_ml,
            alcohol_grams
        );
        ResetOutcome::Removed {
            entries: removed.len(),
            amount_ml,
            alcohol_grams,
        }
    }

    /// Clear everything unconditionally
    pub fn reset_all(&mut self) -> ResetOutcome {
        let outcome = if self.entries.is_empty() {
            ResetOutcome::NothingToReset
        } else {
            ResetOutcome::Removed {
                entries: self.entries.len(),
                amount_ml: self.session.total_amount_ml,
                alcohol_grams: self.session.total_alcohol_grams,
            }
        };

        self.entries.clear();
        self.daily.clear();
        self.session = SessionState::default();
        tracing::info!("Ledger cleared");
        outcome
    }

    /// Entries, most recent first
    pub fn entries(&self) -> &[DrinkEntry] {
        &self.entries
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn daily(&self) -> &DailyAggregator {
        &self.daily
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
