//! Snapshot persistence with file locking.
//!
//! A [`Snapshot`] is the full persisted state: ledger totals, entries,
//! daily records and the profile. The top-level keys reuse the names of
//! the app's earlier key-value layout; entry and profile shapes are our own.
//!
//! Loading is lenient per part: an unreadable entry is dropped, unreadable
//! daily records or profile fall back to their defaults. Only a file that is
//! not a snapshot at all loads as empty, and it is copied aside first.
//!
//! Writers in separate processes serialize through a [`WriterLock`] on the
//! data directory held across load, mutate and save.

use crate::ledger::DrinkLedger;
use crate::profile::Profile;
use crate::types::{DailyRecord, DrinkEntry};
use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persisted state of a tracker
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub total_amount: u64,
    #[serde(default)]
    pub total_alcohol_grams: f64,
    #[serde(default)]
    pub first_drink_time: i64,
    /// Entries, most recent first
    #[serde(default, deserialize_with = "readable_entries")]
    pub history: Vec<DrinkEntry>,
    #[serde(default, deserialize_with = "or_default")]
    pub daily_records: BTreeMap<String, DailyRecord>,
    #[serde(default, deserialize_with = "or_default")]
    pub user_profile: Option<Profile>,
}

/// Suffix of the copy kept when a state file cannot be read at all
pub const CORRUPT_SUFFIX: &str = "corrupt";

/// Name of the writer lock file inside the data directory
pub const LOCK_FILE_NAME: &str = ".lock";

/// Keep every entry that parses, drop the rest
fn readable_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<DrinkEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<DrinkEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Dropping unreadable stored entry: {}", e);
                None
            }
        })
        .collect())
}

fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable stored field: {}", e);
        T::default()
    }))
}

impl Snapshot {
    pub fn capture(ledger: &DrinkLedger, profile: &Profile) -> Self {
        let session = ledger.session();
        Self {
            total_amount: session.total_amount_ml,
            total_alcohol_grams: session.total_alcohol_grams,
            first_drink_time: session.first_drink_timestamp_ms,
            history: ledger.entries().to_vec(),
            daily_records: ledger.daily().records().clone(),
            user_profile: Some(profile.clone()),
        }
    }

    /// Rebuild the live ledger and profile
    ///
    /// The entries are authoritative; daily records are re-derived from
    /// them. A missing or invalid profile falls back to the default.
    pub fn into_parts(self) -> (DrinkLedger, Profile) {
        let ledger = DrinkLedger::from_parts(
            self.history,
            self.total_alcohol_grams,
            self.total_amount,
            self.first_drink_time,
        );

        if &self.daily_records != ledger.daily().records() {
            tracing::warn!("Stored daily records disagree with history, re-derived from entries");
        }

        let profile = match self.user_profile.map(Profile::validate) {
            Some(Ok(profile)) => profile,
            Some(Err(e)) => {
                tracing::warn!("Stored profile is invalid ({}), using defaults", e);
                Profile::default()
            }
            None => Profile::default(),
        };

        (ledger, profile)
    }
}

/// Persistence collaborator for snapshots
pub trait SnapshotStore {
    fn load(&self) -> Result<Snapshot>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot stored as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable state file is copied before it can be overwritten
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(CORRUPT_SUFFIX);
        PathBuf::from(name)
    }

    fn keep_corrupt_copy(&self, contents: &str) {
        if contents.trim().is_empty() {
            return;
        }
        let backup = self.corrupt_path();
        match std::fs::write(&backup, contents) {
            Ok(()) => tracing::warn!("Kept unreadable state in {:?}", backup),
            Err(e) => tracing::error!("Unable to keep unreadable state in {:?}: {}", backup, e),
        }
    }
}

/// Exclusive lock on a data directory, released on drop
///
/// The state file itself is replaced by rename on every save, so writers
/// lock a separate, never-renamed file instead.
#[derive(Debug)]
pub struct WriterLock {
    file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Block until the lock on `dir` is held, creating the directory if needed
    pub fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        tracing::debug!("Acquired writer lock {:?}", path);
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release writer lock {:?}: {}", self.path, e);
        }
    }
}

impl SnapshotStore for JsonFileStore {
    /// Load the snapshot with a shared lock
    ///
    /// Returns an empty snapshot if the file doesn't exist.
    /// If the file is unreadable or corrupted, logs a warning and returns
    /// an empty snapshot.
    fn load(&self) -> Result<Snapshot> {
        let path = &self.path;
        if !path.exists() {
            tracing::info!("No state file at {:?}, starting empty", path);
            return Ok(Snapshot::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open state file {:?}: {}. Starting empty.", path, e);
                return Ok(Snapshot::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock state file {:?}: {}. Starting empty.", path, e);
            return Ok(Snapshot::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read state file {:?}: {}. Starting empty.", path, e);
            return Ok(Snapshot::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => {
                tracing::debug!(
                    "Loaded {} entries from {:?}",
                    snapshot.history.len(),
                    path
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("Failed to parse state file {:?}: {}. Starting empty.", path, e);
                self.keep_corrupt_copy(&contents);
                Ok(Snapshot::default())
            }
        }
    }

    /// Atomically write the snapshot
    ///
    /// Writes to a locked temp file in the same directory, syncs it, then
    /// renames it over the original.
    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved state to {:?}", self.path);
        Ok(())
    }
}

/// In-process store, for embedding hosts that persist elsewhere and tests
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    snapshot: Option<Snapshot>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            saves: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone().unwrap_or_default())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }
}
