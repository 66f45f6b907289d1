//! Configuration builder

use std::time::Duration;

use url::Url;

use super::jwt::{JwtAuthSettings, OrgPolicy};
use crate::Error;
use crate::cache::{CacheBackend, CacheConfig};
use crate::claims::ClaimExtractor;
use crate::verifier::VerifierConfig;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt: JwtAuthSettings,
    pub verifier: VerifierConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
    pub directory: DirectoryConfig,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn jwt(&self) -> &JwtAuthSettings {
        &self.jwt
    }

    #[must_use]
    pub const fn verifier(&self) -> &VerifierConfig {
        &self.verifier
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Organization seeded into the in-memory directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOrg {
    pub id: i64,
    pub name: String,
}

/// In-memory directory configuration
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    pub orgs: Vec<SeedOrg>,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    jwt: JwtAuthSettings,
    verifier: VerifierConfig,
    cache: CacheConfig,
    telemetry: TelemetryConfig,
    directory: DirectoryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jwt: JwtAuthSettings::new(),
            verifier: VerifierConfig::new(),
            cache: CacheConfig::new(),
            telemetry: TelemetryConfig {
                log_level: String::new(),
                json_logs: false,
            },
            directory: DirectoryConfig { orgs: Vec::new() },
        }
    }

    // Claim mapping

    #[must_use]
    pub fn username_claim(mut self, claim: Option<String>) -> Self {
        self.jwt.username_claim = claim;
        self
    }

    #[must_use]
    pub fn email_claim(mut self, claim: Option<String>) -> Self {
        self.jwt.email_claim = claim;
        self
    }

    #[must_use]
    pub fn name_claim(mut self, claim: Option<String>) -> Self {
        self.jwt.name_claim = claim;
        self
    }

    #[must_use]
    pub fn role_attribute_path(mut self, path: Option<String>) -> Self {
        self.jwt.role_attribute_path = path;
        self
    }

    #[must_use]
    pub fn groups_attribute_path(mut self, path: Option<String>) -> Self {
        self.jwt.groups_attribute_path = path;
        self
    }

    /// Create unknown users on login (disabled by default)
    #[must_use]
    pub const fn allow_signup(mut self, allow: bool) -> Self {
        self.jwt.allow_signup = allow;
        self
    }

    /// Lifetime of remembered token to user id mappings (default: 60 minutes)
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwt.cache_ttl = ttl;
        self
    }

    // Organization policy

    #[must_use]
    pub const fn org_policy(mut self, policy: OrgPolicy) -> Self {
        self.jwt.org = policy;
        self
    }

    #[must_use]
    pub const fn auto_assign_org(mut self, enabled: bool) -> Self {
        self.jwt.org.auto_assign_org = enabled;
        self
    }

    #[must_use]
    pub const fn auto_assign_org_id(mut self, org_id: i64) -> Self {
        self.jwt.org.auto_assign_org_id = org_id;
        self
    }

    #[must_use]
    pub const fn default_org_id(mut self, org_id: i64) -> Self {
        self.jwt.org.default_org_id = org_id;
        self
    }

    #[must_use]
    pub const fn org_id(mut self, org_id: i64) -> Self {
        self.jwt.org_id = org_id;
        self
    }

    // Token verification

    #[must_use]
    pub fn issuer(mut self, issuer: Option<String>) -> Self {
        self.verifier.issuer = issuer;
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: Vec<String>) -> Self {
        self.verifier.audience = audience;
        self
    }

    #[must_use]
    pub fn hs_secret(mut self, secret: Option<String>) -> Self {
        self.verifier.hs_secret = secret;
        self
    }

    #[must_use]
    pub fn jwks_uri(mut self, uri: Option<Url>) -> Self {
        self.verifier.jwks_uri = uri;
        self
    }

    #[must_use]
    pub const fn clock_skew(mut self, skew: Duration) -> Self {
        self.verifier.clock_skew = skew;
        self
    }

    #[must_use]
    pub const fn jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.verifier.jwks_cache_ttl = ttl;
        self
    }

    // Cache

    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache.backend = backend;
        self
    }

    #[must_use]
    pub const fn cache_max_entries(mut self, max: Option<usize>) -> Self {
        self.cache.max_entries = max;
        self
    }

    // Telemetry

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    // Directory

    /// Seed an organization into the in-memory directory
    #[must_use]
    pub fn org(mut self, id: i64, name: impl Into<String>) -> Self {
        self.directory.orgs.push(SeedOrg {
            id,
            name: name.into(),
        });
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        if !self.verifier.has_key_source() {
            return Err(Error::Config(
                "either verifier.hs_secret or verifier.jwks_uri is required".into(),
            ));
        }

        if self.jwt.org.auto_assign_org && self.jwt.org.auto_assign_org_id <= 0 {
            return Err(Error::Config(
                "auto_assign_org_id must be positive when auto_assign_org is enabled".into(),
            ));
        }

        if self.jwt.cache_ttl.is_zero() {
            return Err(Error::Config("cache_ttl must be greater than zero".into()));
        }

        // Reject attribute paths that would fail on every login
        ClaimExtractor::new(&self.jwt)
            .map_err(|e| Error::Config(format!("Invalid attribute path: {e}")))?;

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            jwt: self.jwt,
            verifier: self.verifier,
            cache: self.cache,
            telemetry: TelemetryConfig {
                log_level,
                json_logs: self.telemetry.json_logs,
            },
            directory: self.directory,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
