//! # Engine Configuration
//!
//! Settings for one till: where the database lives, what a bonus point is
//! worth and how partial returns are priced.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASSA_DB_PATH=/srv/kassa/kassa.db                                  │
//! │     KASSA_BONUS_RATE=10                                                │
//! │     KASSA_RETURN_PRICING=sale_time                                     │
//! │     KASSA_CODE_VALIDITY_DAYS=1                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kassa/kassa.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.kassa.pos/kassa.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir kassa.db, rate 10, current price, 1 day          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kassa.toml
//! [database]
//! path = "/srv/kassa/kassa.db"   # ":memory:" for a throwaway till
//!
//! [loyalty]
//! bonus_rate = 10                # currency units per redeemed point
//! code_validity_days = 1         # lifetime of a rotated bonus code
//!
//! [returns]
//! pricing = "current_price"      # current_price | sale_time
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use kassa_core::{Money, ReturnPricing, BONUS_RATE};
use kassa_db::DbConfig;

use crate::error::ConfigError;

/// Fallback database file when no platform data directory is known.
const FALLBACK_DB_PATH: &str = "kassa.db";

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `None` resolves to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[loyalty]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltySettings {
    /// Currency units one redeemed point takes off a check.
    #[serde(default = "default_bonus_rate")]
    pub bonus_rate: i64,

    /// Days a freshly rotated bonus code stays valid (counting today).
    #[serde(default = "default_code_validity_days")]
    pub code_validity_days: u32,
}

fn default_bonus_rate() -> i64 {
    BONUS_RATE.units()
}

fn default_code_validity_days() -> u32 {
    1
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        LoyaltySettings {
            bonus_rate: default_bonus_rate(),
            code_validity_days: default_code_validity_days(),
        }
    }
}

/// `[returns]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSettings {
    #[serde(default)]
    pub pricing: ReturnPricing,
}

// =============================================================================
// Engine Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub loyalty: LoyaltySettings,

    #[serde(default)]
    pub returns: ReturnSettings,
}

impl EngineConfig {
    /// Config for tests and demos: private in-memory database, defaults
    /// everywhere else.
    pub fn in_memory() -> Self {
        EngineConfig {
            database: DatabaseSettings {
                path: Some(PathBuf::from(":memory:")),
            },
            ..Default::default()
        }
    }

    /// Loads configuration from file, then environment, then validates.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading kassa config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load kassa config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Kassa config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loyalty.bonus_rate <= 0 {
            return Err(ConfigError::Invalid(format!(
                "bonus_rate must be greater than 0, got {}",
                self.loyalty.bonus_rate
            )));
        }

        if self.loyalty.code_validity_days == 0 {
            return Err(ConfigError::Invalid(
                "code_validity_days must be greater than 0".into(),
            ));
        }

        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("database path is empty".into()));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `KASSA_*` overrides read through `lookup`.
    ///
    /// Unparsable values are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("KASSA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(rate) = lookup("KASSA_BONUS_RATE") {
            match rate.trim().parse::<i64>() {
                Ok(r) => self.loyalty.bonus_rate = r,
                Err(_) => warn!(value = %rate, "Ignoring invalid KASSA_BONUS_RATE"),
            }
        }

        if let Some(pricing) = lookup("KASSA_RETURN_PRICING") {
            match pricing.parse::<ReturnPricing>() {
                Ok(p) => {
                    debug!(pricing = %pricing, "Overriding return pricing from environment");
                    self.returns.pricing = p;
                }
                Err(_) => warn!(value = %pricing, "Ignoring invalid KASSA_RETURN_PRICING"),
            }
        }

        if let Some(days) = lookup("KASSA_CODE_VALIDITY_DAYS") {
            match days.trim().parse::<u32>() {
                Ok(d) => self.loyalty.code_validity_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid KASSA_CODE_VALIDITY_DAYS"),
            }
        }
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kassa", "pos")
            .map(|dirs| dirs.config_dir().join("kassa.toml"))
    }

    /// `kassa.db` in the platform data directory.
    pub fn default_database_path() -> PathBuf {
        directories::ProjectDirs::from("com", "kassa", "pos")
            .map(|dirs| dirs.data_dir().join(FALLBACK_DB_PATH))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DB_PATH))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The configured database path, or the platform default.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// Builds the pool configuration, creating the data directory if needed.
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        let path = self.database_path();
        let config = DbConfig::new(&path);

        if !config.is_in_memory() {
            ensure_parent_dir(&path)?;
        }

        Ok(config)
    }

    pub fn bonus_rate(&self) -> Money {
        Money::from_units(self.loyalty.bonus_rate)
    }

    pub fn return_pricing(&self) -> ReturnPricing {
        self.returns.pricing
    }

    pub fn code_validity_days(&self) -> u32 {
        self.loyalty.code_validity_days
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
