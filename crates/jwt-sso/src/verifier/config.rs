//! Token verifier configuration

use std::time::Duration;

use url::Url;

pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Signature and registered-claim validation settings
#[derive(Clone, Default)]
pub struct VerifierConfig {
    /// Expected `iss`; unchecked when unset
    pub issuer: Option<String>,
    /// Accepted `aud` values; unchecked when empty
    pub audience: Vec<String>,
    /// Shared secret for HS256/384/512 tokens
    pub hs_secret: Option<String>,
    /// Key set for RS*/ES* tokens
    pub jwks_uri: Option<Url>,
    /// Tolerance for `exp`/`nbf`
    pub clock_skew: Duration,
    pub jwks_cache_ttl: Duration,
}

// Omits hs_secret
impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("jwks_uri", &self.jwks_uri)
            .field("clock_skew", &self.clock_skew)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .finish_non_exhaustive()
    }
}

impl VerifierConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock_skew: DEFAULT_CLOCK_SKEW,
            jwks_cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_hs_secret(mut self, secret: impl Into<String>) -> Self {
        self.hs_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_jwks_uri(mut self, uri: Url) -> Self {
        self.jwks_uri = Some(uri);
        self
    }

    #[must_use]
    pub const fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Whether any key source is configured
    #[must_use]
    pub const fn has_key_source(&self) -> bool {
        self.hs_secret.is_some() || self.jwks_uri.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let config = VerifierConfig::new().with_hs_secret("super-secret-value");
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-value"));
        assert!(debug_str.contains("VerifierConfig"));
    }

    #[test]
    fn test_defaults() {
        let config = VerifierConfig::new();
        assert_eq!(config.clock_skew, DEFAULT_CLOCK_SKEW);
        assert_eq!(config.jwks_cache_ttl, DEFAULT_JWKS_CACHE_TTL);
        assert!(!config.has_key_source());
    }

    #[test]
    fn test_builder() {
        let config = VerifierConfig::new()
            .with_issuer("https://idp.example.com")
            .with_audience(vec!["app".to_string()])
            .with_jwks_uri(Url::parse("https://idp.example.com/jwks").unwrap())
            .with_clock_skew(Duration::from_secs(5));
        assert_eq!(config.issuer.as_deref(), Some("https://idp.example.com"));
        assert_eq!(config.audience, vec!["app"]);
        assert!(config.has_key_source());
        assert_eq!(config.clock_skew, Duration::from_secs(5));
    }
}
