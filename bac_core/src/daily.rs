//! Per-day grouping of recorded drinks.
//!
//! Day keys are always computed in the local timezone. The ledger, the
//! aggregator and every view go through [`day_key`] / [`date_key`] so a
//! drink lands on the same day everywhere.

use crate::types::{DailyRecord, DailyTotal, DrinkEntry};
use crate::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Format of day keys (`YYYY-MM-DD`)
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Local date-time of an epoch-millisecond timestamp
pub fn local_datetime(timestamp_ms: i64) -> Result<DateTime<Local>> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| Error::invalid(format!("timestamp out of range: {}", timestamp_ms)))
}

/// Local calendar day of an epoch-millisecond timestamp
pub fn local_date(timestamp_ms: i64) -> Result<NaiveDate> {
    Ok(local_datetime(timestamp_ms)?.date_naive())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Day key of an epoch-millisecond timestamp
pub fn day_key(timestamp_ms: i64) -> Result<String> {
    Ok(date_key(local_date(timestamp_ms)?))
}

pub fn parse_day_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DAY_KEY_FORMAT)
        .map_err(|e| Error::invalid(format!("bad day key {:?}: {}", key, e)))
}

/// Daily records keyed by local day
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DailyAggregator {
    records: BTreeMap<String, DailyRecord>,
}

impl DailyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the record of its local day, creating it if needed
    pub fn update(&mut self, entry: &DrinkEntry) -> Result<()> {
        let key = day_key(entry.timestamp_ms())?;
        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| DailyRecord::empty(key));

        record.total_amount += u64::from(entry.volume_ml());
        record.total_alcohol += entry.alcohol_grams();
        record.drinks.push(entry.clone());

        tracing::debug!(
            "Day {} now at {} mL / {:.2} g",
            record.date,
            record.total_amount,
            record.total_alcohol
        );
        Ok(())
    }

    /// Totals for a day; zeros when nothing was recorded
    pub fn daily_total(&self, date_key: &str) -> DailyTotal {
        self.records
            .get(date_key)
            .map(|r| DailyTotal {
                amount_ml: r.total_amount,
                alcohol_grams: r.total_alcohol,
            })
            .unwrap_or_default()
    }

    pub fn remove(&mut self, date_key: &str) -> Option<DailyRecord> {
        self.records.remove(date_key)
    }

    pub fn get(&self, date_key: &str) -> Option<&DailyRecord> {
        self.records.get(date_key)
    }

    pub fn records(&self) -> &BTreeMap<String, DailyRecord> {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
