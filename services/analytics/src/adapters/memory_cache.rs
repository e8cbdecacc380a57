//! services/analytics/src/adapters/memory_cache.rs
//!
//! An in-process implementation of the `CacheStore` port: an LRU map with
//! per-key expiry. The LRU bound handles capacity; expiry is checked on read.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use reading_analytics_core::ports::{CacheStore, PortResult};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

fn get_at(entries: &mut LruCache<String, CacheEntry>, key: &str, now: Instant) -> Option<String> {
    let lookup = entries
        .get(key)
        .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));
    match lookup {
        Some(Some(value)) => Some(value),
        Some(None) => {
            debug!(%key, "dropping expired cache entry");
            entries.pop(key);
            None
        }
        None => None,
    }
}

fn insert_at(entries: &mut LruCache<String, CacheEntry>, key: &str, value: String, ttl: Duration, now: Instant) {
    let evicted = entries.push(
        key.to_string(),
        CacheEntry {
            value,
            expires_at: now + ttl,
        },
    );
    if let Some((old_key, _)) = evicted.filter(|(old_key, _)| old_key != key) {
        debug!(key = %old_key, "evicted least recently used cache entry");
    }
}

/// A process-local cache shared across requests.
pub struct InMemoryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(LruCache::new(DEFAULT_MAX_ENTRIES)),
        }
    }

    /// A zero bound is treated as one entry.
    pub fn with_max_entries(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(get_at(&mut *self.entries.lock().await, key, Instant::now()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> PortResult<()> {
        insert_at(&mut *self.entries.lock().await, key, value, ttl, Instant::now());
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.pop(key);
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in matching {
            entries.pop(&key);
        }
        Ok(())
    }
}
