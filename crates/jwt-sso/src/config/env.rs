//! Environment variable loading for configuration

use std::env;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::cache::CacheBackend;

/// Environment variable names
mod vars {
    pub const USERNAME_CLAIM: &str = "JWT_SSO_USERNAME_CLAIM";
    pub const EMAIL_CLAIM: &str = "JWT_SSO_EMAIL_CLAIM";
    pub const NAME_CLAIM: &str = "JWT_SSO_NAME_CLAIM";
    pub const ROLE_ATTRIBUTE_PATH: &str = "JWT_SSO_ROLE_ATTRIBUTE_PATH";
    pub const GROUPS_ATTRIBUTE_PATH: &str = "JWT_SSO_GROUPS_ATTRIBUTE_PATH";
    pub const ALLOW_SIGNUP: &str = "JWT_SSO_ALLOW_SIGNUP";
    pub const CACHE_TTL_MINUTES: &str = "JWT_SSO_CACHE_TTL_MINUTES";
    pub const AUTO_ASSIGN_ORG: &str = "JWT_SSO_AUTO_ASSIGN_ORG";
    pub const AUTO_ASSIGN_ORG_ID: &str = "JWT_SSO_AUTO_ASSIGN_ORG_ID";
    pub const DEFAULT_ORG_ID: &str = "JWT_SSO_DEFAULT_ORG_ID";
    pub const ORG_ID: &str = "JWT_SSO_ORG_ID";
    pub const ISSUER: &str = "JWT_SSO_ISSUER";
    pub const AUDIENCE: &str = "JWT_SSO_AUDIENCE";
    pub const HS_SECRET: &str = "JWT_SSO_HS_SECRET";
    pub const JWKS_URI: &str = "JWT_SSO_JWKS_URI";
    pub const CLOCK_SKEW_SECS: &str = "JWT_SSO_CLOCK_SKEW_SECS";
    pub const CACHE_ENABLED: &str = "JWT_SSO_CACHE_ENABLED";
    pub const CACHE_BACKEND: &str = "JWT_SSO_CACHE_BACKEND";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "JWT_SSO_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Claim mapping
    if let Ok(claim) = env::var(vars::USERNAME_CLAIM) {
        builder = builder.username_claim(Some(claim));
    }
    if let Ok(claim) = env::var(vars::EMAIL_CLAIM) {
        builder = builder.email_claim(Some(claim));
    }
    if let Ok(claim) = env::var(vars::NAME_CLAIM) {
        builder = builder.name_claim(Some(claim));
    }
    if let Ok(path) = env::var(vars::ROLE_ATTRIBUTE_PATH) {
        builder = builder.role_attribute_path(Some(path));
    }
    if let Ok(path) = env::var(vars::GROUPS_ATTRIBUTE_PATH) {
        builder = builder.groups_attribute_path(Some(path));
    }

    if let Ok(val) = env::var(vars::ALLOW_SIGNUP) {
        builder = builder.allow_signup(parse_bool(&val));
    }

    if let Ok(ttl_str) = env::var(vars::CACHE_TTL_MINUTES)
        && let Ok(minutes) = ttl_str.parse::<u64>()
    {
        builder = builder.cache_ttl(Duration::from_secs(minutes.saturating_mul(60)));
    }

    // Organization policy
    if let Ok(val) = env::var(vars::AUTO_ASSIGN_ORG) {
        builder = builder.auto_assign_org(parse_bool(&val));
    }

    if let Ok(id_str) = env::var(vars::AUTO_ASSIGN_ORG_ID)
        && let Ok(id) = id_str.parse::<i64>()
    {
        builder = builder.auto_assign_org_id(id);
    }

    if let Ok(id_str) = env::var(vars::DEFAULT_ORG_ID)
        && let Ok(id) = id_str.parse::<i64>()
    {
        builder = builder.default_org_id(id);
    }

    if let Ok(id_str) = env::var(vars::ORG_ID)
        && let Ok(id) = id_str.parse::<i64>()
    {
        builder = builder.org_id(id);
    }

    // Token verification
    if let Ok(issuer) = env::var(vars::ISSUER) {
        builder = builder.issuer(Some(issuer));
    }

    if let Ok(audience) = env::var(vars::AUDIENCE) {
        let audience: Vec<String> = audience
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        builder = builder.audience(audience);
    }

    if let Ok(secret) = env::var(vars::HS_SECRET) {
        builder = builder.hs_secret(Some(secret));
    }

    if let Ok(uri_str) = env::var(vars::JWKS_URI) {
        let uri = Url::parse(&uri_str)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", vars::JWKS_URI, e)))?;
        builder = builder.jwks_uri(Some(uri));
    }

    if let Ok(skew_str) = env::var(vars::CLOCK_SKEW_SECS)
        && let Ok(secs) = skew_str.parse::<u64>()
    {
        builder = builder.clock_skew(Duration::from_secs(secs));
    }

    // Cache
    if let Ok(val) = env::var(vars::CACHE_ENABLED) {
        builder = builder.cache_enabled(parse_bool(&val));
    }

    if let Ok(backend) = env::var(vars::CACHE_BACKEND) {
        let backend: CacheBackend = backend.parse().map_err(crate::Error::Config)?;
        builder = builder.cache_backend(backend);
    }

    // Telemetry
    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
