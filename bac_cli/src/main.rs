use bac_core::*;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bactrack")]
#[command(about = "Blood alcohol estimator and drink log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend the current time is this (RFC 3339, or local YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a drink (beer, wine, vodka, whisky, cocktail, champagne)
    Drink {
        kind: String,

        /// Volume in mL
        #[arg(allow_negative_numbers = true)]
        volume_ml: i64,

        /// Strength in % ABV (defaults to the catalog strength)
        #[arg(long)]
        strength: Option<f64>,
    },

    /// Show current BAC, status and time to sober (default)
    Status,

    /// Show the last 7 days
    Week,

    /// Show every day of a month
    Month {
        /// YYYY-MM, defaults to the current month
        month: Option<String>,
    },

    /// Show the drinks of one day
    Day {
        /// YYYY-MM-DD, defaults to today
        date: Option<String>,
    },

    /// Remove all drinks of one day
    ResetDay {
        /// YYYY-MM-DD, defaults to today
        date: Option<String>,
    },

    /// Remove every recorded drink
    ResetAll {
        /// Confirm clearing all data
        #[arg(long)]
        yes: bool,
    },

    /// Show or change the physiological profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Lifetime statistics
    Stats,

    /// Export data to CSV
    Export {
        /// Write one row per day to this file
        #[arg(long)]
        daily: Option<PathBuf>,

        /// Write one row per drink to this file
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Periodically recompute and save the state
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Drink { .. }
                | Commands::ResetDay { .. }
                | Commands::ResetAll { yes: true }
                | Commands::Profile {
                    action: Some(ProfileAction::Set { .. })
                }
        )
    }
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    Set {
        /// Body weight in kg (30-200)
        #[arg(long)]
        weight: Option<f64>,

        #[arg(long, value_enum)]
        sex: Option<Sex>,

        /// Elimination rate in ‰ per hour
        #[arg(long)]
        elimination_rate: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Sex {
    Male,
    Female,
}

/// Wall clock, or a fixed one when `--now` is given
enum CliClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl Clock for CliClock {
    fn now_ms(&self) -> i64 {
        match self {
            CliClock::System(c) => c.now_ms(),
            CliClock::Fixed(c) => c.now_ms(),
        }
    }
}

type CliTracker = Tracker<JsonFileStore, CliClock>;

fn main() -> Result<()> {
    // Initialize logging
    bac_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let clock = match &cli.now {
        Some(s) => CliClock::Fixed(FixedClock::new(parse_now(s)?)),
        None => CliClock::System(SystemClock),
    };

    // Writers hold the data-dir lock from load to save; watch locks per tick
    let _lock = match &cli.command {
        Some(command) if command.mutates() => Some(WriterLock::acquire(&data_dir)?),
        _ => None,
    };

    tracing::debug!("Using data directory {:?}", data_dir);
    let store = JsonFileStore::new(data_dir.join("state.json"));
    let mut tracker = Tracker::open(store, clock)?.with_catalog(config.catalog()?);

    match cli.command {
        Some(Commands::Drink {
            kind,
            volume_ml,
            strength,
        }) => cmd_drink(&mut tracker, &kind, volume_ml, strength),
        Some(Commands::Status) | None => cmd_status(&tracker),
        Some(Commands::Week) => cmd_week(&tracker),
        Some(Commands::Month { month }) => cmd_month(&tracker, month),
        Some(Commands::Day { date }) => cmd_day(&tracker, date),
        Some(Commands::ResetDay { date }) => cmd_reset_day(&mut tracker, date),
        Some(Commands::ResetAll { yes }) => cmd_reset_all(&mut tracker, yes),
        Some(Commands::Profile { action }) => match action {
            Some(ProfileAction::Show) | None => cmd_profile_show(&tracker),
            Some(ProfileAction::Set {
                weight,
                sex,
                elimination_rate,
            }) => cmd_profile_set(&mut tracker, weight, sex, elimination_rate),
        },
        Some(Commands::Stats) => cmd_stats(&tracker),
        Some(Commands::Export { daily, history }) => {
            cmd_export(&tracker, daily.as_deref(), history.as_deref())
        }
        Some(Commands::Watch { ticks }) => cmd_watch(&mut tracker, &config, &data_dir, ticks),
    }
}

fn parse_now(s: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::InvalidInput(format!("bad --now value {:?}: {}", s, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| Error::InvalidInput(format!("{} does not exist in local time", s)))
}

fn resolve_date(tracker: &CliTracker, date: Option<String>) -> Result<String> {
    match date {
        Some(d) => Ok(daily::date_key(daily::parse_day_key(&d)?)),
        None => tracker.today_key(),
    }
}

fn report_persist<T>(outcome: &Outcome<T>) {
    if let Err(e) = &outcome.persist {
        eprintln!("warning: changes kept in memory but not saved: {}", e);
    }
}

fn cmd_drink(
    tracker: &mut CliTracker,
    kind: &str,
    volume_ml: i64,
    strength: Option<f64>,
) -> Result<()> {
    let kind: DrinkKind = kind.parse()?;
    let outcome = tracker.record_drink(kind, volume_ml, strength)?;
    report_persist(&outcome);

    let entry = &outcome.value;
    println!(
        "+{} mL {} at {}% ({:.1} g alcohol)",
        entry.volume_ml(),
        entry.kind(),
        entry.strength_percent(),
        entry.alcohol_grams()
    );
    cmd_status(tracker)
}

fn cmd_status(tracker: &CliTracker) -> Result<()> {
    let reading = tracker.reading()?;

    println!(
        "BAC: {:.3} ‰ ({:.4} %)",
        reading.bac,
        units::permille_to_percent(reading.bac)
    );
    println!("Status: {}", reading.status);

    if reading.sober.is_sober() {
        println!("Time to sober: sober");
    } else {
        let (hours, minutes) = reading.sober.hours_minutes();
        let sober_at = daily::local_datetime(reading.sober.sober_at_ms(reading.now_ms))?;
        println!(
            "Time to sober: {}h {}m (around {})",
            hours,
            minutes,
            sober_at.format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(advisory) = reading.sober.advisory {
        println!("{}", advisory.message());
    }

    println!(
        "Today: {} mL, {:.1} g alcohol",
        reading.today.amount_ml, reading.today.alcohol_grams
    );
    println!(
        "Session: {} mL, {:.1} g alcohol",
        reading.total_amount_ml, reading.total_alcohol_grams
    );
    Ok(())
}

fn print_days(days: &[DayAmount]) {
    for day in days {
        println!("{} {}: {} mL", day.day_label, day.date, day.amount_ml);
    }
}

fn cmd_week(tracker: &CliTracker) -> Result<()> {
    print_days(&tracker.weekly()?);
    Ok(())
}

fn cmd_month(tracker: &CliTracker, month: Option<String>) -> Result<()> {
    let (year, month) = match month {
        Some(m) => {
            let first = chrono::NaiveDate::parse_from_str(&format!("{}-01", m.trim()), "%Y-%m-%d")
                .map_err(|e| Error::InvalidInput(format!("bad month {:?}: {}", m, e)))?;
            (first.year(), first.month())
        }
        None => {
            let today = daily::local_date(tracker.clock().now_ms())?;
            (today.year(), today.month())
        }
    };

    let days = tracker.month(year, month)?;
    let total: u64 = days.iter().map(|d| d.amount_ml).sum();
    let drinking_days: Vec<DayAmount> = days.into_iter().filter(|d| d.amount_ml > 0).collect();

    println!("{}-{:02}: {} mL over {} days", year, month, total, drinking_days.len());
    print_days(&drinking_days);
    Ok(())
}

fn cmd_day(tracker: &CliTracker, date: Option<String>) -> Result<()> {
    let key = resolve_date(tracker, date)?;
    match tracker.day_details(&key) {
        Some(record) => {
            println!("{}", key);
            println!("Total: {} mL", record.total_amount);
            println!("Alcohol: {:.1} g", record.total_alcohol);
            for drink in &record.drinks {
                let at = daily::local_datetime(drink.timestamp_ms())?;
                println!(
                    "  {} {}: {} mL ({:.1} g alcohol)",
                    at.format("%H:%M"),
                    drink.kind(),
                    drink.volume_ml(),
                    drink.alcohol_grams()
                );
            }
        }
        None => println!("{}: sober day", key),
    }
    Ok(())
}

fn cmd_reset_day(tracker: &mut CliTracker, date: Option<String>) -> Result<()> {
    let key = resolve_date(tracker, date)?;
    let outcome = tracker.reset_day(&key);
    report_persist(&outcome);

    match outcome.value {
        ResetOutcome::Removed {
            entries,
            amount_ml,
            alcohol_grams,
        } => println!(
            "Reset {}: removed {} drinks ({} mL, {:.1} g alcohol)",
            key, entries, amount_ml, alcohol_grams
        ),
        ResetOutcome::NothingToReset => println!("Nothing to reset for {}", key),
    }
    Ok(())
}

fn cmd_reset_all(tracker: &mut CliTracker, yes: bool) -> Result<()> {
    if !yes {
        return Err(Error::InvalidInput(
            "refusing to clear all data without --yes".into(),
        ));
    }

    let outcome = tracker.reset_all();
    report_persist(&outcome);
    match outcome.value {
        ResetOutcome::Removed { entries, .. } => println!("Cleared {} drinks", entries),
        ResetOutcome::NothingToReset => println!("Nothing to reset"),
    }
    Ok(())
}

fn cmd_profile_show(tracker: &CliTracker) -> Result<()> {
    let profile = tracker.profile();
    println!(
        "Weight: {:.1} kg ({:.1} lb)",
        profile.weight_kg(),
        units::kg_to_lb(profile.weight_kg())
    );
    println!("Sex: {}", if profile.is_male() { "male" } else { "female" });
    println!(
        "Elimination rate: {:.3} ‰/h ({})",
        profile.elimination_rate_per_hour(),
        profile.metabolism_class()
    );
    println!("Distribution factor: {}", profile.distribution_factor());
    println!("Created: {}", profile.created_date());
    Ok(())
}

fn cmd_profile_set(
    tracker: &mut CliTracker,
    weight: Option<f64>,
    sex: Option<Sex>,
    elimination_rate: Option<f64>,
) -> Result<()> {
    let current = tracker.profile().clone();
    let is_male = match sex {
        Some(Sex::Male) => true,
        Some(Sex::Female) => false,
        None => current.is_male(),
    };
    // Changing sex without an explicit rate moves to that sex's default
    let rate = elimination_rate.unwrap_or_else(|| {
        if is_male == current.is_male() {
            current.elimination_rate_per_hour()
        } else {
            profile::default_elimination_rate(is_male)
        }
    });

    let updated = Profile::new(
        weight.unwrap_or_else(|| current.weight_kg()),
        is_male,
        rate,
        current.created_date(),
    )?;

    let outcome = tracker.set_profile(updated);
    report_persist(&outcome);
    println!("Profile saved");
    cmd_profile_show(tracker)
}

fn cmd_stats(tracker: &CliTracker) -> Result<()> {
    let stats = tracker.stats();
    println!("Total: {} mL", stats.total_amount_ml);
    println!("Alcohol: {:.1} g", stats.total_alcohol_grams);
    println!("Drinks: {}", stats.drinks_count);
    if stats.distribution.is_empty() {
        println!("No data");
    }
    for (kind, amount) in &stats.distribution {
        println!("  {}: {} mL", kind, amount);
    }
    Ok(())
}

fn cmd_export(tracker: &CliTracker, daily: Option<&Path>, history: Option<&Path>) -> Result<()> {
    if daily.is_none() && history.is_none() {
        return Err(Error::InvalidInput(
            "nothing to export: pass --daily and/or --history".into(),
        ));
    }

    if let Some(path) = daily {
        let count = export::write_daily_csv(tracker.ledger().daily().records(), path)?;
        println!("✓ Exported {} days to {}", count, path.display());
    }
    if let Some(path) = history {
        let count = export::write_history_csv(tracker.ledger().entries(), path)?;
        println!("✓ Exported {} drinks to {}", count, path.display());
    }
    Ok(())
}

fn cmd_watch(
    tracker: &mut CliTracker,
    config: &Config,
    data_dir: &Path,
    ticks: Option<u64>,
) -> Result<()> {
    let interval = config.tick_interval();
    let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
    let mut done = 0u64;

    loop {
        // Other processes may have written since the last tick
        let outcome = {
            let _lock = WriterLock::acquire(data_dir)?;
            tracker.reload()?;
            tracker.tick()?
        };
        report_persist(&outcome);
        let reading = &outcome.value;
        let at = daily::local_datetime(reading.now_ms)?;
        println!(
            "[{}] BAC {:.3} ‰ - {}",
            at.format("%H:%M"),
            reading.bac,
            reading.status
        );

        done += 1;
        if ticks.map_or(false, |limit| done >= limit) {
            return Ok(());
        }

        // A fixed clock is simulated instead of waited on
        match tracker.clock() {
            CliClock::Fixed(clock) => clock.advance_ms(interval_ms),
            CliClock::System(_) => std::thread::sleep(interval),
        }
    }
}
