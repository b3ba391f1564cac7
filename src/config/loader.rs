//! Configuration Loader
//!
//! Layers embedded defaults, an optional TOML file and prefixed environment
//! variables with the `config` crate, then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::SyncConfig;
use crate::constants::env;
use config::{Config, Environment, File, FileFormat, Map};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULTS: &str = include_str!("defaults.toml");

/// Builder-style loader for [`SyncConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_source: Option<Map<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a TOML file over the defaults; the file must exist
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read overrides from this map instead of the process environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn with_env_source(mut self, vars: Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn load(&self) -> ConfigResult<SyncConfig> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Toml));

        if let Some(path) = &self.file {
            if !path.is_file() {
                return Err(ConfigurationError::FileNotFound(path.display().to_string()));
            }
            debug!(path = %path.display(), "Layering configuration file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(env::CONFIG_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source.clone()),
        );

        let config: SyncConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            max_attempts = config.sync.max_attempts,
            backoff_unit_ms = config.sync.backoff_unit_ms,
            batch_failure_policy = %config.sync.batch_failure_policy,
            table_name = %config.database.table_name,
            cache_ttl_seconds = config.cache.ttl_seconds,
            "Configuration loaded"
        );
        Ok(config)
    }
}
