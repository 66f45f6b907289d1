//! Cache key types and token fingerprinting

use std::fmt;

const FNV128_OFFSET_BASIS: u128 = 0x6c62_272e_07bb_0142_62b8_2175_6295_c58d;
const FNV128_PRIME: u128 = 0x0000_0000_0100_0000_0000_0000_0000_013b;

/// 128-bit FNV-1a hash
#[must_use]
pub fn fnv1a128(data: &[u8]) -> u128 {
    data.iter().fold(FNV128_OFFSET_BASIS, |hash, byte| {
        (hash ^ u128::from(*byte)).wrapping_mul(FNV128_PRIME)
    })
}

/// Lowercase hex of the big-endian FNV-1a-128 digest of `token`
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(fnv1a128(token.as_bytes()).to_be_bytes())
}

/// Cache key namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Token fingerprint to synced user id
    AuthJwtSync,
}

impl CacheNamespace {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthJwtSync => "auth-jwt:sync",
        }
    }
}

/// Structured cache key with namespace isolation
///
/// Keys never contain the raw token, only its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    identifier: String,
}

impl CacheKey {
    /// Key for the user id synced from `token`
    #[must_use]
    pub fn auth_jwt_sync(token: &str) -> Self {
        Self {
            namespace: CacheNamespace::AuthJwtSync,
            identifier: token_fingerprint(token),
        }
    }

    #[must_use]
    pub const fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Convert to string key for storage
    #[must_use]
    pub fn to_key_string(&self) -> String {
        format!("{}-{}", self.namespace.as_str(), self.identifier)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace.as_str(), self.identifier)
    }
}
