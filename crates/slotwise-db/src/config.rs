//! # Slotwise Configuration
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults                                                           │
//! │  2. slotwise.toml (path given, or $SLOTWISE_CONFIG, or ./slotwise.toml)│
//! │  3. Environment:                                                       │
//! │       SLOTWISE_DB_PATH             → database.path                     │
//! │       SLOTWISE_MAX_CONNECTIONS     → database.max_connections          │
//! │       SLOTWISE_RESERVE_TIMEOUT_MS  → booking.reserve_timeout_ms        │
//! │                                                                         │
//! │  Later sources override earlier ones.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [database]
//! path = "/var/lib/slotwise/slotwise.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [booking]
//! reserve_timeout_ms = 3000
//! log_notifications = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

const CONFIG_ENV: &str = "SLOTWISE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "slotwise.toml";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize failed: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: PathBuf::from("slotwise.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            run_migrations: true,
        }
    }
}

/// `[booking]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// Upper bound on the lock-recheck-insert step of a reservation.
    pub reserve_timeout_ms: u64,
    /// Use [`LoggingNotifier`](crate::notifier::LoggingNotifier) instead of a no-op.
    pub log_notifications: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            reserve_timeout_ms: 5_000,
            log_notifications: true,
        }
    }
}

impl BookingSettings {
    pub fn reserve_timeout(&self) -> Duration {
        Duration::from_millis(self.reserve_timeout_ms)
    }
}

// =============================================================================
// Root
// =============================================================================

/// Complete Slotwise configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotwiseConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub booking: BookingSettings,
}

impl SlotwiseConfig {
    /// Loads defaults, then the config file, then environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = config_path
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading config from file");
            Self::from_file(&path)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// [`load`](Self::load)). Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SLOTWISE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("SLOTWISE_MAX_CONNECTIONS") {
            match raw.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid SLOTWISE_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("SLOTWISE_RESERVE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.booking.reserve_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid SLOTWISE_RESERVE_TIMEOUT_MS"),
            }
        }
    }

    /// Rejects values that would make the service unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.booking.reserve_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "booking.reserve_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Pool settings for [`Database::new`](crate::pool::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .run_migrations(self.database.run_migrations)
    }
}
