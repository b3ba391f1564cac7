//! In-process TTL cache for resolved connection parameters and secrets.
//!
//! Backed by Moka with a cache-level time-to-live. Expired entries are never
//! returned by [`TtlCache::get`]; a background sweeper started with
//! [`TtlCache::spawn_sweeper`] runs Moka's pending maintenance on its own
//! interval so expired entries are released even when the cache is idle.
//!
//! **Important**: this cache is NOT distributed. Each process keeps its own
//! copy, so every process performs its own first lookup against the store.

use crate::config::CacheConfig;
use crate::constants::{
    DEFAULT_CACHE_MAX_CAPACITY, DEFAULT_CACHE_SWEEP_INTERVAL, DEFAULT_CACHE_TTL,
};
use moka::notification::RemovalCause;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Concurrent string cache; all entries share the TTL set at construction
pub struct TtlCache {
    cache: moka::future::Cache<String, String>,
    ttl: Duration,
    sweep_interval: Duration,
    expired: Arc<AtomicU64>,
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_SWEEP_INTERVAL)
    }
}

impl TtlCache {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self::with_capacity(DEFAULT_CACHE_MAX_CAPACITY, ttl, sweep_interval)
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.max_capacity, config.ttl(), config.sweep_interval())
    }

    pub fn with_capacity(max_capacity: u64, ttl: Duration, sweep_interval: Duration) -> Self {
        let expired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&expired);

        let cache = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        debug!(
            max_capacity = max_capacity,
            ttl_seconds = ttl.as_secs(),
            sweep_interval_seconds = sweep_interval.as_secs(),
            "TTL cache created"
        );

        Self {
            cache,
            ttl,
            sweep_interval,
            expired,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Store `value` under `key`, replacing any previous entry and restarting its TTL
    pub async fn set(&self, key: &str, value: &str) {
        self.cache.insert(key.to_string(), value.to_string()).await;
        debug!(key = key, ttl_seconds = self.ttl.as_secs(), "Cache SET");
    }

    /// Live value for `key`, `None` on miss or expiry
    pub async fn get(&self, key: &str) -> Option<String> {
        let result = self.cache.get(key).await;

        if result.is_some() {
            debug!(key = key, "Cache HIT");
        } else {
            debug!(key = key, "Cache MISS");
        }
        result
    }

    /// Run pending maintenance, returning how many expired entries it released
    pub async fn purge_expired(&self) -> usize {
        let before = self.expired.load(Ordering::Relaxed);
        self.cache.run_pending_tasks().await;
        let after = self.expired.load(Ordering::Relaxed);
        usize::try_from(after.saturating_sub(before)).unwrap_or(usize::MAX)
    }

    /// Entry count as of the last maintenance run; may lag recent writes
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Exact number of live entries
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Start the background sweep task
    ///
    /// The task holds only a weak reference and ends once the cache is dropped
    /// or the returned handle is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let cache: Weak<Self> = Arc::downgrade(self);
        let interval = self.sweep_interval;

        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("TTL cache dropped, stopping sweeper");
                    break;
                };
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!(
                        purged = purged,
                        remaining = cache.entry_count(),
                        "Swept expired cache entries"
                    );
                }
            }
        });

        SweeperHandle { task }
    }
}

/// Owns the sweep task; dropping it stops the sweeper
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
