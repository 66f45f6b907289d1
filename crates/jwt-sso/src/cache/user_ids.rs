//! Token fingerprint to user id cache

use std::sync::Arc;
use std::time::Duration;

use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::CacheProvider;

/// Maps token fingerprints to resolved user ids
///
/// Reads never fail: backend errors and undecodable entries are misses.
/// Writes and deletes report backend errors to the caller.
#[derive(Clone)]
pub struct UserIdCache {
    provider: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl std::fmt::Debug for UserIdCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserIdCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl UserIdCache {
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<i64> {
        let result = self.provider.get(key).await.and_then(|bytes| {
            bytes.map(|b| decode_user_id(&b)).transpose()
        });

        match result {
            Ok(user_id) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_lookup(if user_id.is_some() {
                    "hit"
                } else {
                    "miss"
                });
                user_id
            }
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_lookup("error");
                tracing::debug!(cache.key = %key, error = %e, "Treating cache read failure as miss");
                None
            }
        }
    }

    /// Store `user_id` unless a live entry already exists
    ///
    /// An existing entry is neither overwritten nor has its TTL refreshed.
    pub async fn set_if_absent(&self, key: &CacheKey, user_id: i64) -> CacheResult<()> {
        if let Ok(Some(_)) = self.provider.get(key).await {
            return Ok(());
        }
        self.provider
            .set(key, &user_id.to_be_bytes(), Some(self.ttl))
            .await
    }

    /// Remove the entry; absent entries are not an error
    pub async fn delete(&self, key: &CacheKey) -> CacheResult<()> {
        self.provider.delete(key).await.map(|_| ())
    }
}

fn decode_user_id(bytes: &[u8]) -> CacheResult<i64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        CacheError::Deserialization(format!("expected 8 bytes, got {}", bytes.len()))
    })?;
    Ok(i64::from_be_bytes(raw))
}
