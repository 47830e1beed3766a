//! Read-only projections of daily records: the 7-day window and the
//! days of a calendar month.

use crate::daily::date_key;
use crate::types::DailyRecord;
use crate::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Volume drunk on one day
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayAmount {
    /// Short weekday name, e.g. `Mon`
    pub day_label: String,
    pub date: NaiveDate,
    pub amount_ml: u64,
}

fn day_amount(date: NaiveDate, records: &BTreeMap<String, DailyRecord>) -> DayAmount {
    let amount_ml = records
        .get(&date_key(date))
        .map(|r| r.total_amount)
        .unwrap_or(0);

    DayAmount {
        day_label: date.format("%a").to_string(),
        date,
        amount_ml,
    }
}

/// The 7 days ending at `today` inclusive, oldest first
pub fn last_7_days(today: NaiveDate, records: &BTreeMap<String, DailyRecord>) -> Vec<DayAmount> {
    (0..7i64)
        .rev()
        .map(|days_back| day_amount(today - Duration::days(days_back), records))
        .collect()
}

/// Every day of a calendar month, first to last
pub fn month_days(
    year: i32,
    month: u32,
    records: &BTreeMap<String, DailyRecord>,
) -> Result<Vec<DayAmount>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::invalid(format!("no such month: {}-{:02}", year, month)))?;

    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| day_amount(d, records))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, amount: u64) -> (String, DailyRecord) {
        (
            date.to_string(),
            DailyRecord {
                date: date.to_string(),
                total_amount: amount,
                total_alcohol: amount as f64 * 0.04,
                drinks: Vec::new(),
            },
        )
    }

    #[test]
    fn test_empty_week_is_seven_zero_days() {
        // 2025-03-16 is a Sunday
        let today = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let week = last_7_days(today, &BTreeMap::new());

        assert_eq!(week.len(), 7);
        assert!(week.iter().all(|d| d.amount_ml == 0));
        let labels: Vec<&str> = week.iter().map(|d| d.day_label.as_str()).collect();
        assert_eq!(labels, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(week[6].date, today);
    }

    #[test]
    fn test_week_picks_up_records_in_window_only() {
        let records: BTreeMap<_, _> = [
            record("2025-03-09", 999),
            record("2025-03-10", 500),
            record("2025-03-16", 330),
        ]
        .into_iter()
        .collect();

        let today = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let week = last_7_days(today, &records);
        let amounts: Vec<u64> = week.iter().map(|d| d.amount_ml).collect();
        assert_eq!(amounts, vec![500, 0, 0, 0, 0, 0, 330]);
    }

    #[test]
    fn test_week_spans_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let week = last_7_days(today, &BTreeMap::new());
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2025, 2, 24).unwrap());
    }

    #[test]
    fn test_month_days() {
        let records: BTreeMap<_, _> = [record("2024-02-29", 250)].into_iter().collect();
        let days = month_days(2024, 2, &records).unwrap();

        assert_eq!(days.len(), 29);
        assert_eq!(days[28].amount_ml, 250);
        assert_eq!(days[0].amount_ml, 0);
    }

    #[test]
    fn test_month_days_rejects_bad_month() {
        assert!(matches!(
            month_days(2025, 13, &BTreeMap::new()),
            Err(Error::InvalidInput(_))
        ));
    }
}
