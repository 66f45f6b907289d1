//! In-memory cache implementation with TTL support

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::config::DEFAULT_MAX_VALUE_SIZE;
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::CacheProvider;

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Thread-safe in-memory cache with TTL support
///
/// Expired entries are dropped lazily on access and before eviction. When
/// `max_entries` is reached, the entry closest to expiry is evicted. A TTL
/// too large to represent as an `Instant` never expires.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: Option<usize>,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("max_entries", &self.max_entries)
            .field("entry_count", &self.store.read().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            max_entries: None,
        }
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    fn evict_one(store: &mut HashMap<String, CacheEntry>, now: Instant) {
        store.retain(|_, entry| !entry.is_expired(now));
        let victim = store
            .iter()
            .min_by_key(|(_, entry)| {
                entry
                    .expires_at
                    .map_or(Duration::MAX, |exp| exp.saturating_duration_since(now))
            })
            .map(|(key, _)| key.clone());
        if let Some(victim) = victim {
            store.remove(&victim);
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let key_str = key.to_key_string();
        let now = Instant::now();

        let store = self.store.read();
        let (value, expired) = match store.get(&key_str) {
            Some(entry) if entry.is_expired(now) => (None, true),
            Some(entry) => (Some(entry.value.clone()), false),
            None => (None, false),
        };
        drop(store);

        if expired {
            self.store.write().remove(&key_str);
        }
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        if value.len() > DEFAULT_MAX_VALUE_SIZE {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: DEFAULT_MAX_VALUE_SIZE,
            });
        }

        let key_str = key.to_key_string();
        let now = Instant::now();
        let entry = CacheEntry {
            value: value.to_vec(),
            expires_at: ttl.and_then(|d| now.checked_add(d)),
        };

        let mut store = self.store.write();
        if let Some(max) = self.max_entries
            && store.len() >= max
            && !store.contains_key(&key_str)
        {
            Self::evict_one(&mut store, now);
        }
        store.insert(key_str, entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.store.write().remove(&key.to_key_string()).is_some())
    }
}
