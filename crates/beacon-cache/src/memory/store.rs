//! In-memory store implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::{debug, warn};

use beacon_core::config::MemoryStoreConfig;
use beacon_core::error::AppError;
use beacon_core::result::AppResult;
use beacon_core::traits::store::KeyValueStore;
use beacon_core::types::store_value::{StoreKey, StoreValue};

/// A cached value together with the lifetime it was written with.
#[derive(Debug, Clone)]
struct Entry {
    value: StoreValue,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: StoreValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            ttl,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Per-entry expiry policy: every write restarts the clock with the
/// lifetime it carries, reads never extend it.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-memory store provider using moka.
///
/// Entries leave only by expiry or explicit delete. The cache is built
/// without a size bound so moka never evicts a live credential; the
/// configured capacity is enforced on write instead.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// The underlying moka cache.
    cache: Cache<String, Entry>,
    /// Workspace prefixed to every key.
    workspace: String,
    /// Most entries a write may grow the cache to.
    max_entries: u64,
}

impl MemoryStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig, workspace: impl Into<String>) -> Self {
        let cache = Cache::builder().expire_after(EntryExpiry).build();

        Self {
            cache,
            workspace: workspace.into(),
            max_entries: config.max_capacity,
        }
    }

    /// Number of entries currently held, including ones not yet evicted.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions so `entry_count` is exact.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    fn physical_key(&self, key: &StoreKey) -> String {
        key.qualified(&self.workspace)
    }

    async fn write(&self, key: &StoreKey, entry: Entry) -> AppResult<()> {
        let full_key = self.physical_key(key);
        if !self.cache.contains_key(&full_key) && self.cache.entry_count() >= self.max_entries {
            // The count lags behind expiries until pending tasks run.
            self.cache.run_pending_tasks().await;
            if self.cache.entry_count() >= self.max_entries {
                warn!(key = %full_key, capacity = self.max_entries, "Memory store is full");
                return Err(AppError::store(format!(
                    "Memory store is full ({} entries)",
                    self.max_entries
                )));
            }
        }

        debug!(key = %full_key, ttl = ?entry.ttl, "Writing store entry");
        self.cache.insert(full_key, entry).await;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &StoreKey, value: StoreValue) -> AppResult<()> {
        self.write(key, Entry::new(value, None)).await
    }

    async fn put_with_ttl(&self, key: &StoreKey, value: StoreValue, ttl: Duration) -> AppResult<()> {
        if ttl.is_zero() {
            return Err(AppError::validation(format!(
                "TTL for '{key}' must be greater than zero"
            )));
        }
        self.write(key, Entry::new(value, Some(ttl))).await
    }

    async fn get_value(&self, key: &StoreKey) -> AppResult<StoreValue> {
        match self.cache.get(&self.physical_key(key)).await {
            Some(entry) if entry.is_live() => Ok(entry.value),
            _ => Err(AppError::not_found(format!("Store key '{key}' not found"))),
        }
    }

    async fn delete(&self, key: &StoreKey) -> AppResult<StoreValue> {
        match self.cache.remove(&self.physical_key(key)).await {
            Some(entry) if entry.is_live() => Ok(entry.value),
            _ => Err(AppError::not_found(format!("Store key '{key}' not found"))),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
