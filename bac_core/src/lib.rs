#![forbid(unsafe_code)]

//! Blood alcohol estimation and consumption ledger.
//!
//! This crate provides:
//! - Unit conversions and the beverage catalog
//! - The drink ledger with per-day aggregation
//! - The linear Widmark BAC engine (status, sober-time projection)
//! - Weekly/monthly views and lifetime statistics
//! - Persistence (JSON snapshot, CSV export) and configuration
//! - A single-writer [`Tracker`] tying it together

pub mod types;
pub mod error;
pub mod units;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod profile;
pub mod daily;
pub mod ledger;
pub mod engine;
pub mod weekly;
pub mod stats;
pub mod clock;
pub mod store;
pub mod export;
pub mod tracker;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{get_default_catalog, BeverageCatalog};
pub use config::Config;
pub use profile::{MetabolismClass, Profile, ProfileHub, SubscriptionId};
pub use daily::{day_key, DailyAggregator};
pub use ledger::{DrinkLedger, ResetOutcome};
pub use engine::{evaluate, status, time_to_sober, Advisory, Intoxication, SoberEstimate};
pub use weekly::{last_7_days, month_days, DayAmount};
pub use stats::{summarize, Stats};
pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{JsonFileStore, MemoryStore, Snapshot, SnapshotStore, WriterLock};
pub use tracker::{Outcome, Reading, Tracker};
