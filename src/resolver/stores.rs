//! External parameter and secret store seams.
//!
//! The resolver never talks to a concrete cloud SDK. It asks a
//! [`StoreConnector`] for one client per store, once, and then issues lookups
//! through the [`ParameterStore`] and [`SecretStore`] traits.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Hierarchical parameter store holding serialized connection parameters
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Secret store holding serialized credentials
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String>;
}

/// Builds store clients; called at most once per store by the resolver
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect_parameter_store(&self) -> Result<Arc<dyn ParameterStore>>;
    async fn connect_secret_store(&self) -> Result<Arc<dyn SecretStore>>;
}

/// Map-backed store usable as either a parameter or a secret store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
    lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Number of lookups served so far, hits and misses alike
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, key: &str) -> Result<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SyncError::store(key, "key not found"))
    }
}

#[async_trait]
impl ParameterStore for InMemoryStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.lookup(name)
    }
}

#[async_trait]
impl SecretStore for InMemoryStore {
    async fn get_secret_string(&self, secret_id: &str) -> Result<String> {
        self.lookup(secret_id)
    }
}

/// Hands out pre-built in-memory stores and counts connections
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    parameters: Arc<InMemoryStore>,
    secrets: Arc<InMemoryStore>,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(parameters: Arc<InMemoryStore>, secrets: Arc<InMemoryStore>) -> Self {
        Self {
            parameters,
            secrets,
            connects: AtomicUsize::new(0),
        }
    }

    /// Total clients created across both stores
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect_parameter_store(&self) -> Result<Arc<dyn ParameterStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store: Arc<dyn ParameterStore> = self.parameters.clone();
        Ok(store)
    }

    async fn connect_secret_store(&self) -> Result<Arc<dyn SecretStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store: Arc<dyn SecretStore> = self.secrets.clone();
        Ok(store)
    }
}

/// Loads a JSON object of `key -> serialized value` from disk for local runs
///
/// Values may be given either as strings holding the serialized payload or as
/// inline JSON objects, which are re-serialized as-is.
#[derive(Debug, Clone)]
pub struct JsonFileConnector {
    path: PathBuf,
}

impl JsonFileConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Arc<InMemoryStore>> {
        let path_label = self.path.display().to_string();
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SyncError::store(&path_label, e))?;
        let document: HashMap<String, Value> = serde_json::from_str(&contents)
            .map_err(|e| SyncError::config_parse(format!("store file {path_label}"), e))?;

        let store = InMemoryStore::new();
        for (key, value) in document {
            let serialized = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            store.insert(key, serialized);
        }

        info!(path = %path_label, "Loaded local store file");
        Ok(Arc::new(store))
    }
}

#[async_trait]
impl StoreConnector for JsonFileConnector {
    async fn connect_parameter_store(&self) -> Result<Arc<dyn ParameterStore>> {
        debug!(path = %self.path.display(), "Opening parameter store");
        let store: Arc<dyn ParameterStore> = self.load().await?;
        Ok(store)
    }

    async fn connect_secret_store(&self) -> Result<Arc<dyn SecretStore>> {
        debug!(path = %self.path.display(), "Opening secret store");
        let store: Arc<dyn SecretStore> = self.load().await?;
        Ok(store)
    }
}
