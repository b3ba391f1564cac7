//! # Sync Configuration
//!
//! Typed configuration for the sync engine, loaded in layers by
//! [`ConfigLoader`]:
//!
//! 1. built-in defaults (`defaults.toml`, embedded at compile time)
//! 2. an optional TOML file
//! 3. `ORDERS_CDC__<SECTION>__<KEY>` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orders_cdc::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! assert_eq!(config.sync.max_attempts, 3);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::constants::{
    attributes, env, DEFAULT_BACKOFF_UNIT, DEFAULT_CACHE_MAX_CAPACITY,
    DEFAULT_CACHE_SWEEP_INTERVAL, DEFAULT_CACHE_TTL, DEFAULT_MAX_ATTEMPTS, DEFAULT_TABLE_NAME,
};
use crate::sync::BatchFailurePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub sync: SyncSettings,
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
    pub database: DatabaseConfig,
}

/// Upsert retry and batch behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Total attempts per record, the first one included
    pub max_attempts: u32,
    /// One backoff time unit; the wait after attempt `n` is `n² × unit`
    pub backoff_unit_ms: u64,
    pub batch_failure_policy: BatchFailurePolicy,
    pub primary_key_attribute: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT.as_millis() as u64,
            batch_failure_policy: BatchFailurePolicy::default(),
            primary_key_attribute: attributes::PRIMARY_KEY.to_string(),
        }
    }
}

impl SyncSettings {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL.as_secs(),
            sweep_interval_seconds: DEFAULT_CACHE_SWEEP_INTERVAL.as_secs(),
            max_capacity: DEFAULT_CACHE_MAX_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Names of the environment variables holding the store lookup keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub connection_param_env: String,
    pub credentials_secret_env: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            connection_param_env: env::CONNECTION_PARAM_NAME.to_string(),
            credentials_secret_env: env::CREDENTIALS_SECRET_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub table_name: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl SyncConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sync.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "sync.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        if self.sync.primary_key_attribute.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "sync.primary_key_attribute",
                "",
                "primary key attribute name must not be empty",
            ));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.ttl_seconds",
                "0",
                "cache TTL must be greater than 0",
            ));
        }

        if self.cache.sweep_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.sweep_interval_seconds",
                "0",
                "sweep interval must be greater than 0",
            ));
        }

        if self.cache.max_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.max_capacity",
                "0",
                "cache capacity must be greater than 0",
            ));
        }

        for (field, value) in [
            ("resolver.connection_param_env", &self.resolver.connection_param_env),
            ("resolver.credentials_secret_env", &self.resolver.credentials_secret_env),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.as_str(),
                    "environment variable name must not be empty",
                ));
            }
        }

        if !is_valid_table_name(&self.database.table_name) {
            return Err(ConfigurationError::invalid_value(
                "database.table_name",
                self.database.table_name.as_str(),
                "expected an identifier, optionally schema-qualified",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// `table` or `schema.table`, each part `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|part| is_identifier(part))
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
