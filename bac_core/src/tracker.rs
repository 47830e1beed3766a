//! Single-writer session facade.
//!
//! A [`Tracker`] owns the ledger, the profile and the collaborators
//! (store, clock). Every mutation follows the same cycle: change memory,
//! try to save a snapshot, report the save result in an [`Outcome`]. A
//! failed save never rolls back the live state.
//!
//! The tracker is not `Sync`; hosts that drive it from several places
//! (user actions plus a periodic [`Tracker::tick`]) must serialize calls,
//! e.g. behind one mutex or on one event loop.

use crate::catalog::{get_default_catalog, BeverageCatalog};
use crate::clock::Clock;
use crate::daily::{date_key, day_key, local_date};
use crate::engine::{self, Intoxication, SoberEstimate};
use crate::ledger::{DrinkLedger, ResetOutcome};
use crate::profile::{Profile, ProfileHub, SubscriptionId};
use crate::stats::{self, Stats};
use crate::store::{Snapshot, SnapshotStore};
use crate::types::{DailyRecord, DailyTotal, DrinkEntry, DrinkKind};
use crate::weekly::{self, DayAmount};
use crate::{Error, Result};

/// Value of a mutation plus the result of persisting it
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub persist: Result<()>,
}

impl<T> Outcome<T> {
    fn new(value: T, persist: Result<()>) -> Self {
        Self { value, persist }
    }

    pub fn persisted(&self) -> bool {
        self.persist.is_ok()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Everything a front end displays at a point in time
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub now_ms: i64,
    /// ‰
    pub bac: f64,
    pub status: Intoxication,
    pub sober: SoberEstimate,
    pub today: DailyTotal,
    pub total_amount_ml: u64,
    pub total_alcohol_grams: f64,
}

pub struct Tracker<S, C> {
    ledger: DrinkLedger,
    profile: Profile,
    hub: ProfileHub,
    catalog: BeverageCatalog,
    store: S,
    clock: C,
}

impl<S: SnapshotStore, C: Clock> Tracker<S, C> {
    /// Load the persisted snapshot and start tracking
    pub fn open(store: S, clock: C) -> Result<Self> {
        let (ledger, profile) = store.load()?.into_parts();
        tracing::info!(
            "Tracker opened with {} entries, session active: {}",
            ledger.entries().len(),
            ledger.session().is_active()
        );

        Ok(Self {
            ledger,
            profile,
            hub: ProfileHub::new(),
            catalog: get_default_catalog().clone(),
            store,
            clock,
        })
    }

    /// Use a catalog with configured strength overrides
    pub fn with_catalog(mut self, catalog: BeverageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the live ledger and profile with the stored snapshot
    ///
    /// Hosts that share the store with other writers call this while
    /// holding the [`WriterLock`](crate::store::WriterLock), before mutating
    /// or ticking. Subscribers are notified if the stored profile differs.
    pub fn reload(&mut self) -> Result<()> {
        let (ledger, profile) = self.store.load()?.into_parts();
        self.ledger = ledger;
        if profile != self.profile {
            self.profile = profile;
            self.hub.publish(&self.profile);
        }
        tracing::debug!("Reloaded {} entries", self.ledger.entries().len());
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        let snapshot = Snapshot::capture(&self.ledger, &self.profile);
        self.store.save(&snapshot).map_err(|e| {
            tracing::error!("Failed to persist state: {}", e);
            Error::Persistence(e.to_string())
        })
    }

    /// Record a drink at the current time
    ///
    /// Without an explicit strength the catalog strength of `kind` is used.
    pub fn record_drink(
        &mut self,
        kind: DrinkKind,
        volume_ml: i64,
        strength_percent: Option<f64>,
    ) -> Result<Outcome<DrinkEntry>> {
        let strength = strength_percent.unwrap_or_else(|| self.catalog.strength_of(kind));
        let now = self.clock.now_ms();
        let entry = self.ledger.record(kind, volume_ml, strength, now)?;
        let persist = self.persist();
        Ok(Outcome::new(entry, persist))
    }

    /// Remove one day's drinks; nothing is saved when the day is empty
    pub fn reset_day(&mut self, date_key: &str) -> Outcome<ResetOutcome> {
        let outcome = self.ledger.reset_day(date_key);
        let persist = match outcome {
            ResetOutcome::NothingToReset => Ok(()),
            ResetOutcome::Removed { .. } => self.persist(),
        };
        Outcome::new(outcome, persist)
    }

    pub fn reset_today(&mut self) -> Result<Outcome<ResetOutcome>> {
        let today = day_key(self.clock.now_ms())?;
        Ok(self.reset_day(&today))
    }

    pub fn reset_all(&mut self) -> Outcome<ResetOutcome> {
        let outcome = self.ledger.reset_all();
        let persist = self.persist();
        Outcome::new(outcome, persist)
    }

    /// Replace the profile wholesale and notify subscribers
    pub fn set_profile(&mut self, profile: Profile) -> Outcome<()> {
        self.profile = profile;
        self.hub.publish(&self.profile);
        let persist = self.persist();
        Outcome::new((), persist)
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Profile) + 'static,
    {
        self.hub.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Evaluate the engine at the current time
    pub fn reading(&self) -> Result<Reading> {
        let now_ms = self.clock.now_ms();
        let session = self.ledger.session();

        let bac = engine::evaluate(
            session.total_alcohol_grams,
            &self.profile,
            session.first_drink_timestamp_ms,
            now_ms,
        )?;
        let sober = engine::time_to_sober(bac, self.profile.elimination_rate_per_hour())?;
        let today = self.ledger.daily().daily_total(&day_key(now_ms)?);

        Ok(Reading {
            now_ms,
            bac,
            status: engine::status(bac),
            sober,
            today,
            total_amount_ml: session.total_amount_ml,
            total_alcohol_grams: session.total_alcohol_grams,
        })
    }

    /// Periodic recompute-and-persist with no new entry
    pub fn tick(&mut self) -> Result<Outcome<Reading>> {
        let reading = self.reading()?;
        tracing::debug!("Tick: BAC {:.3} ‰ ({})", reading.bac, reading.status);
        let persist = self.persist();
        Ok(Outcome::new(reading, persist))
    }

    /// The 7 days ending today
    pub fn weekly(&self) -> Result<Vec<DayAmount>> {
        let today = local_date(self.clock.now_ms())?;
        Ok(weekly::last_7_days(today, self.ledger.daily().records()))
    }

    pub fn month(&self, year: i32, month: u32) -> Result<Vec<DayAmount>> {
        weekly::month_days(year, month, self.ledger.daily().records())
    }

    /// Day record, or None for a sober day
    pub fn day_details(&self, date_key: &str) -> Option<&DailyRecord> {
        self.ledger.daily().get(date_key)
    }

    pub fn today_key(&self) -> Result<String> {
        Ok(date_key(local_date(self.clock.now_ms())?))
    }

    pub fn stats(&self) -> Stats {
        stats::summarize(self.ledger.entries())
    }

    pub fn ledger(&self) -> &DrinkLedger {
        &self.ledger
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn catalog(&self) -> &BeverageCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
