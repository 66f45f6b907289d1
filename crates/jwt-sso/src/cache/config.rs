//! Cache configuration types

use std::str::FromStr;

/// Default maximum value size: 1KB (entries hold a user id)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024;

/// Default maximum number of in-memory entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    Noop,
    #[default]
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "noop" | "none" | "disabled" => Ok(Self::Noop),
            _ => Err(format!("Unknown cache backend: {s}")),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Cache backend type
    pub backend: CacheBackend,
    /// Maximum entries for in-memory cache
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            max_entries: Some(DEFAULT_MAX_ENTRIES),
        }
    }
}
