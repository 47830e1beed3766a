//! Configuration file support for bactrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bactrack/config.toml`.

use crate::catalog::{get_default_catalog, BeverageCatalog};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub drinks: DrinksConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Periodic recompute settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

/// Beverage strength overrides, keyed by drink name
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DrinksConfig {
    #[serde(default)]
    pub strengths: HashMap<String, f64>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("bactrack")
}

fn default_tick_interval_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("bactrack").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timer.tick_interval_secs == 0 {
            return Err(Error::Config("timer.tick_interval_secs must be at least 1".into()));
        }
        self.catalog().map(|_| ())
    }

    /// Default catalog with `[drinks] strengths` applied
    pub fn catalog(&self) -> Result<BeverageCatalog> {
        get_default_catalog().with_overrides(&self.drinks.strengths)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.timer.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DrinkKind;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timer.tick_interval_secs, 60);
        assert!(config.drinks.strengths.is_empty());
        assert!(config.data.data_dir.ends_with("bactrack"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.timer.tick_interval_secs = 30;
        config.drinks.strengths.insert("wine".into(), 13.5);
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.timer.tick_interval_secs, 30);
        assert_eq!(parsed.drinks.strengths.get("wine"), Some(&13.5));
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[drinks.strengths]
beer = 4.2
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timer.tick_interval_secs, 60); // default
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.strength_of(DrinkKind::Beer), 4.2);
    }

    #[test]
    fn test_validation_errors() {
        let zero_tick: Config = toml::from_str("[timer]\ntick_interval_secs = 0\n").unwrap();
        assert!(matches!(zero_tick.validate(), Err(Error::Config(_))));

        let bad_drink: Config = toml::from_str("[drinks.strengths]\nmead = 10.0\n").unwrap();
        assert!(matches!(bad_drink.validate(), Err(Error::Config(_))));
    }
}
