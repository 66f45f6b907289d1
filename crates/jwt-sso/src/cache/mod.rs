//! Token to user id cache
//!
//! Successful logins are remembered under a key derived from the token's
//! FNV-1a-128 fingerprint, so repeated requests with the same token skip
//! verification and claim mapping until the entry expires or is forgotten.
//!
//! # Available Backends
//!
//! - [`NoopCache`] - caching disabled
//! - [`InMemoryCache`] - thread-safe in-memory cache with TTL support
//!
//! Any backend can be wrapped with [`TracedCache`] for debug spans.
//! [`UserIdCache`] layers the user id encoding and the read/write error
//! policy on top of a [`CacheProvider`].

mod config;
mod error;
mod key;
mod memory;
mod noop;
mod provider;
mod traced;
mod user_ids;

use std::sync::Arc;

pub use config::{CacheBackend, CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_VALUE_SIZE};
pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, CacheNamespace, fnv1a128, token_fingerprint};
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use provider::CacheProvider;
pub use traced::TracedCache;
pub use user_ids::UserIdCache;

/// Create a cache provider based on configuration
#[must_use]
pub fn create_cache(config: &CacheConfig) -> Arc<dyn CacheProvider> {
    if !config.enabled {
        return Arc::new(NoopCache::new());
    }

    match config.backend {
        CacheBackend::Noop => Arc::new(NoopCache::new()),
        CacheBackend::Memory => {
            let mut cache = InMemoryCache::new();
            if let Some(max) = config.max_entries {
                cache = cache.with_max_entries(max);
            }
            Arc::new(TracedCache::new(cache, env!("CARGO_PKG_NAME")))
        }
    }
}
