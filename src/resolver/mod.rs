//! # Connection Resolver
//!
//! Resolves database connection parameters and credentials from the external
//! parameter and secret stores, caching the serialized payloads in a
//! [`TtlCache`] so that warm processes do not hit the stores on every batch.
//!
//! The resolver is an explicit object built once at startup and handed to
//! whoever opens the database. Store clients are created lazily behind
//! [`tokio::sync::OnceCell`]s: concurrent first callers wait on the same
//! initialisation and all of them observe the same client instance.

pub mod cache;
pub mod stores;

pub use cache::{SweeperHandle, TtlCache};
pub use stores::{
    InMemoryConnector, InMemoryStore, JsonFileConnector, ParameterStore, SecretStore,
    StoreConnector,
};

use crate::config::ResolverConfig;
use crate::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// Where the database lives and which driver speaks to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub hostname: String,
    pub port: u16,
    #[serde(rename = "db")]
    pub database: String,
    #[serde(rename = "driver")]
    pub driver_name: String,
}

/// Database login; `Debug` output never includes the password
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum StoreKind {
    Parameter,
    Secret,
}

impl StoreKind {
    fn payload_name(self) -> &'static str {
        match self {
            Self::Parameter => "connection parameters",
            Self::Secret => "credentials secret",
        }
    }
}

/// Cached, lazily-connected access to connection parameters and credentials
pub struct ConnectionResolver {
    settings: ResolverConfig,
    cache: Arc<TtlCache>,
    connector: Arc<dyn StoreConnector>,
    parameter_store: OnceCell<Arc<dyn ParameterStore>>,
    secret_store: OnceCell<Arc<dyn SecretStore>>,
    env_lookup: EnvLookup,
}

impl fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("settings", &self.settings)
            .field("cached_entries", &self.cache.entry_count())
            .field("parameter_store_ready", &self.parameter_store.initialized())
            .field("secret_store_ready", &self.secret_store.initialized())
            .finish()
    }
}

impl ConnectionResolver {
    /// Resolver reading lookup keys from the process environment
    pub fn new(
        settings: ResolverConfig,
        cache: Arc<TtlCache>,
        connector: Arc<dyn StoreConnector>,
    ) -> Self {
        Self {
            settings,
            cache,
            connector,
            parameter_store: OnceCell::new(),
            secret_store: OnceCell::new(),
            env_lookup: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace environment access, e.g. with a fixed map in tests
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env_lookup = Arc::new(lookup);
        self
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ResolverConfig {
        &self.settings
    }

    #[instrument(skip(self))]
    pub async fn resolve_connection_config(&self) -> Result<ConnectionConfig> {
        let config: ConnectionConfig = self
            .resolve(&self.settings.connection_param_env, StoreKind::Parameter)
            .await?;
        info!(
            hostname = %config.hostname,
            port = config.port,
            database = %config.database,
            driver = %config.driver_name,
            "Resolved connection parameters"
        );
        Ok(config)
    }

    #[instrument(skip(self))]
    pub async fn resolve_credentials(&self) -> Result<Credentials> {
        let credentials: Credentials = self
            .resolve(&self.settings.credentials_secret_env, StoreKind::Secret)
            .await?;
        info!(username = %credentials.username, "Resolved database credentials");
        Ok(credentials)
    }

    async fn resolve<T: DeserializeOwned>(&self, env_var: &str, kind: StoreKind) -> Result<T> {
        let key =
            (self.env_lookup)(env_var).ok_or_else(|| SyncError::EnvVarMissing(env_var.to_string()))?;

        if let Some(cached) = self.cache.get(&key).await {
            debug!(key = %key, "Using cached {}", kind.payload_name());
            return serde_json::from_str(&cached)
                .map_err(|e| SyncError::config_parse(kind.payload_name(), e));
        }

        let raw = match kind {
            StoreKind::Parameter => self.parameter_store().await?.get_parameter(&key).await?,
            StoreKind::Secret => self.secret_store().await?.get_secret_string(&key).await?,
        };
        let parsed = serde_json::from_str(&raw)
            .map_err(|e| SyncError::config_parse(kind.payload_name(), e))?;

        self.cache.set(&key, &raw).await;
        Ok(parsed)
    }

    async fn parameter_store(&self) -> Result<&Arc<dyn ParameterStore>> {
        self.parameter_store
            .get_or_try_init(|| async {
                info!("Initialising parameter store client");
                self.connector.connect_parameter_store().await
            })
            .await
    }

    async fn secret_store(&self) -> Result<&Arc<dyn SecretStore>> {
        self.secret_store
            .get_or_try_init(|| async {
                info!("Initialising secret store client");
                self.connector.connect_secret_store().await
            })
            .await
    }
}
