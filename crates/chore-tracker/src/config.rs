//! Configuration management for chore-tracker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::chore::{
    ChoreType, Frequency, Priority, DEFAULT_ADAPTIVE_WINDOW, DEFAULT_CATEGORY,
    DEFAULT_ESTIMATED_DURATION, DEFAULT_INTERVAL_DAYS, DEFAULT_MAX_DAYS,
};
use crate::error::{Error, Result};
use crate::validation;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "chore-tracker";

/// Default store file name.
const STORE_FILE_NAME: &str = "chores.json";

/// Default backup directory name, inside the data directory.
const BACKUP_DIR_NAME: &str = "backups";

/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "CHORE_TRACKER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CHORE_TRACKER_`, sections
///    separated by `__`, e.g. `CHORE_TRACKER_SCHEDULE__CHECK_INTERVAL_HOURS`)
/// 2. TOML config file at `~/.config/chore-tracker/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Overdue check configuration.
    pub schedule: ScheduleConfig,
    /// Defaults for newly added chores.
    pub defaults: DefaultsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the chore store.
    /// Defaults to `~/.local/share/chore-tracker/chores.json`
    pub path: Option<PathBuf>,
    /// Directory for backups.
    /// Defaults to `~/.local/share/chore-tracker/backups`
    pub backup_dir: Option<PathBuf>,
    /// Backups older than this many days are removed by cleanup.
    pub backup_retention_days: u32,
}

/// Overdue check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Hours between overdue checks when running as a service.
    pub check_interval_hours: u32,
    /// Reset completed chores to pending once their next due date arrives.
    pub reset_completed: bool,
}

/// Defaults applied to fields omitted when adding a chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Recurrence interval in days.
    pub interval_days: u32,
    /// Recurrence frequency.
    pub frequency: Frequency,
    /// Scheduling policy.
    pub chore_type: ChoreType,
    /// Days added when an adaptive chore is completed late.
    pub max_days: u32,
    /// Days added when an adaptive chore is completed on time.
    pub adaptive_window: u32,
    /// Priority.
    pub priority: Priority,
    /// Category label.
    pub category: String,
    /// Estimated duration in minutes.
    pub estimated_duration: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None, // Will be resolved to default at runtime
            backup_dir: None,
            backup_retention_days: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: 24,
            reset_completed: true,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            interval_days: DEFAULT_INTERVAL_DAYS,
            frequency: Frequency::default(),
            chore_type: ChoreType::default(),
            max_days: DEFAULT_MAX_DAYS,
            adaptive_window: DEFAULT_ADAPTIVE_WINDOW,
            priority: Priority::default(),
            category: DEFAULT_CATEGORY.to_string(),
            estimated_duration: DEFAULT_ESTIMATED_DURATION,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment used by [`Config::load_from`].
    #[must_use]
    pub fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.check_interval_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "check_interval_hours must be greater than 0".to_string(),
            });
        }

        let d = &self.defaults;
        let checks = [
            validation::validate_interval_days(d.interval_days).map(drop),
            validation::validate_window("max_days", d.max_days).map(drop),
            validation::validate_window("adaptive_window", d.adaptive_window).map(drop),
            validation::validate_estimated_duration(d.estimated_duration).map(drop),
            validation::validate_label("category", &d.category).map(drop),
        ];
        for check in checks {
            check.map_err(|err| Error::ConfigValidation {
                message: format!("defaults: {err}"),
            })?;
        }

        Ok(())
    }

    /// Get the store path, resolving defaults if not set.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STORE_FILE_NAME))
    }

    /// Get the backup directory, resolving defaults if not set.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.storage
            .backup_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(BACKUP_DIR_NAME))
    }

    /// Get the overdue check interval as a Duration.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.schedule.check_interval_hours) * 60 * 60)
    }
}
