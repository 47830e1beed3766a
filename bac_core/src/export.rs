//! CSV export of daily records and drink history.
//!
//! Both writers build the file in a temp file next to the target, fsync
//! it and rename it into place, so a failed export never truncates an
//! earlier one.

use crate::daily::local_datetime;
use crate::types::{DailyRecord, DrinkEntry};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the daily CSV output
#[derive(Debug, Serialize)]
struct DailyRow<'a> {
    date: &'a str,
    total_amount_ml: u64,
    total_alcohol_grams: String,
    drinks: usize,
}

impl<'a> From<&'a DailyRecord> for DailyRow<'a> {
    fn from(record: &'a DailyRecord) -> Self {
        DailyRow {
            date: &record.date,
            total_amount_ml: record.total_amount,
            total_alcohol_grams: format!("{:.3}", record.total_alcohol),
            drinks: record.drinks.len(),
        }
    }
}

/// A row in the history CSV output
#[derive(Debug, Serialize)]
struct HistoryRow {
    recorded_at: String,
    timestamp_ms: i64,
    drink: &'static str,
    volume_ml: u32,
    strength_percent: f64,
    alcohol_grams: String,
}

impl TryFrom<&DrinkEntry> for HistoryRow {
    type Error = Error;

    fn try_from(entry: &DrinkEntry) -> Result<Self> {
        Ok(HistoryRow {
            recorded_at: local_datetime(entry.timestamp_ms())?.to_rfc3339(),
            timestamp_ms: entry.timestamp_ms(),
            drink: entry.kind().name(),
            volume_ml: entry.volume_ml(),
            strength_percent: entry.strength_percent(),
            alcohol_grams: format!("{:.3}", entry.alcohol_grams()),
        })
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Write one row per day, oldest first. Returns the number of rows.
pub fn write_daily_csv(records: &BTreeMap<String, DailyRecord>, path: &Path) -> Result<usize> {
    let rows: Vec<DailyRow> = records.values().map(DailyRow::from).collect();
    write_rows(path, &rows)?;
    tracing::info!("Exported {} days to {:?}", rows.len(), path);
    Ok(rows.len())
}

/// Write one row per drink, oldest first. Returns the number of rows.
pub fn write_history_csv(entries: &[DrinkEntry], path: &Path) -> Result<usize> {
    let rows = entries
        .iter()
        .rev()
        .map(HistoryRow::try_from)
        .collect::<Result<Vec<_>>>()?;
    write_rows(path, &rows)?;
    tracing::info!("Exported {} drinks to {:?}", rows.len(), path);
    Ok(rows.len())
}
