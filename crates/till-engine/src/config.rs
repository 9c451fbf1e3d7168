//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use till_core::Money;
use till_db::DbConfig;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Connection acquire and busy timeout in seconds
    pub connect_timeout_secs: u64,

    /// Write audit_log rows after each committed mutation
    pub audit_enabled: bool,

    /// Allowed difference, in cents, between a sale's total and the sum of
    /// its payments (and between its subtotal and the sum of its lines)
    pub money_tolerance_cents: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_path: PathBuf::from("till.db"),
            max_connections: 5,
            connect_timeout_secs: 30,
            audit_enabled: true,
            money_tolerance_cents: 1,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (tests pass a map).
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            db_path: lookup("TILL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            max_connections: parse_or(&lookup, "TILL_MAX_CONNECTIONS", defaults.max_connections)?,

            connect_timeout_secs: parse_or(
                &lookup,
                "TILL_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,

            audit_enabled: parse_or(&lookup, "TILL_AUDIT_ENABLED", defaults.audit_enabled)?,

            money_tolerance_cents: parse_or(
                &lookup,
                "TILL_MONEY_TOLERANCE_CENTS",
                defaults.money_tolerance_cents,
            )?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TILL_MAX_CONNECTIONS".to_string()));
        }
        if config.money_tolerance_cents < 0 {
            return Err(ConfigError::InvalidValue(
                "TILL_MONEY_TOLERANCE_CENTS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path)
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn money_tolerance(&self) -> Money {
        Money::from_cents(self.money_tolerance_cents)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
