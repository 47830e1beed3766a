//! Lifetime statistics over the retained ledger entries.

use crate::types::{DrinkEntry, DrinkKind};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub total_amount_ml: u64,
    pub total_alcohol_grams: f64,
    pub drinks_count: usize,
    /// Volume per beverage, largest first
    pub distribution: Vec<(DrinkKind, u64)>,
}

pub fn summarize(entries: &[DrinkEntry]) -> Stats {
    let mut per_kind: BTreeMap<DrinkKind, u64> = BTreeMap::new();
    for entry in entries {
        *per_kind.entry(entry.kind()).or_default() += u64::from(entry.volume_ml());
    }

    let mut distribution: Vec<(DrinkKind, u64)> = per_kind.into_iter().collect();
    // stable sort keeps kind order for ties
    distribution.sort_by(|a, b| b.1.cmp(&a.1));

    Stats {
        total_amount_ml: entries.iter().map(|e| u64::from(e.volume_ml())).sum(),
        total_alcohol_grams: entries.iter().map(|e| e.alcohol_grams()).sum(),
        drinks_count: entries.len(),
        distribution,
    }
}
