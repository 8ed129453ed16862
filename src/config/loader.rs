//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Secrets never live here; they come from the environment via
//! the wallet provider.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::dedup::{LedgerConfig, LockConfig};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineSection,
    pub services: ServicesSection,
    pub storage: StorageSection,
    #[serde(default)]
    pub dedup: DedupSection,
}

/// Engine scheduling section
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Seconds between evaluation passes
    pub interval_secs: u64,
}

/// External service endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesSection {
    /// Price oracle base URL
    pub price_url: String,
    /// Trade executor base URL
    pub swap_url: String,
}

/// On-disk storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// User record snapshot file (supports ~ expansion)
    pub users_file: String,
    /// Directory holding per-identity dedup ledger segments
    pub ledger_dir: String,
}

/// Dedup ledger tunables; the defaults are the production values
#[derive(Debug, Clone, Deserialize)]
pub struct DedupSection {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default = "default_trim_threshold")]
    pub trim_threshold: usize,
    #[serde(default = "default_trim_count")]
    pub trim_count: usize,
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Lock marker age past which it counts as crash-orphaned
    #[serde(default = "default_lock_stale_ms")]
    pub lock_stale_ms: u64,
}

fn default_ttl_hours() -> u64 {
    24
}
fn default_trim_threshold() -> usize {
    3_000
}
fn default_trim_count() -> usize {
    10
}
fn default_hard_cap() -> usize {
    6_000
}
fn default_lock_stale_ms() -> u64 {
    2_000
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            trim_threshold: default_trim_threshold(),
            trim_count: default_trim_count(),
            hard_cap: default_hard_cap(),
            lock_stale_ms: default_lock_stale_ms(),
        }
    }
}

impl DedupSection {
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            ttl_ms: (self.ttl_hours * 3_600_000) as i64,
            trim_threshold: self.trim_threshold,
            trim_count: self.trim_count,
            hard_cap: self.hard_cap,
            lock: LockConfig {
                stale_ms: self.lock_stale_ms as i64,
                ..LockConfig::default()
            },
            ..LedgerConfig::default()
        }
    }
}

impl EngineSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "interval_secs must be > 0".to_string(),
            ));
        }

        if self.services.price_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "price_url cannot be empty".to_string(),
            ));
        }

        if self.services.swap_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "swap_url cannot be empty".to_string(),
            ));
        }

        if self.storage.users_file.is_empty() {
            return Err(ConfigError::ValidationError(
                "users_file cannot be empty".to_string(),
            ));
        }

        if self.storage.ledger_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "ledger_dir cannot be empty".to_string(),
            ));
        }

        if self.dedup.ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "ttl_hours must be > 0".to_string(),
            ));
        }

        if self.dedup.hard_cap < self.dedup.trim_threshold {
            return Err(ConfigError::ValidationError(format!(
                "hard_cap ({}) must be >= trim_threshold ({})",
                self.dedup.hard_cap, self.dedup.trim_threshold
            )));
        }

        Ok(())
    }
}
