//! TOML configuration file loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::cache::CacheBackend;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./jwt-sso.toml",
    "~/.config/jwt-sso/config.toml",
    "/etc/jwt-sso/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    builder = apply_file_config(builder, file_config)?;
    Ok(builder)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(jwt) = config.jwt {
        if jwt.username_claim.is_some() {
            builder = builder.username_claim(jwt.username_claim);
        }
        if jwt.email_claim.is_some() {
            builder = builder.email_claim(jwt.email_claim);
        }
        if jwt.name_claim.is_some() {
            builder = builder.name_claim(jwt.name_claim);
        }
        if jwt.role_attribute_path.is_some() {
            builder = builder.role_attribute_path(jwt.role_attribute_path);
        }
        if jwt.groups_attribute_path.is_some() {
            builder = builder.groups_attribute_path(jwt.groups_attribute_path);
        }
        if let Some(allow) = jwt.allow_signup {
            builder = builder.allow_signup(allow);
        }
        if let Some(minutes) = jwt.cache_ttl_minutes {
            builder = builder.cache_ttl(Duration::from_secs(minutes.saturating_mul(60)));
        }
    }

    if let Some(org) = config.org {
        if let Some(enabled) = org.auto_assign_org {
            builder = builder.auto_assign_org(enabled);
        }
        if let Some(id) = org.auto_assign_org_id {
            builder = builder.auto_assign_org_id(id);
        }
        if let Some(id) = org.default_org_id {
            builder = builder.default_org_id(id);
        }
        if let Some(id) = org.org_id {
            builder = builder.org_id(id);
        }
    }

    if let Some(verifier) = config.verifier {
        if verifier.issuer.is_some() {
            builder = builder.issuer(verifier.issuer);
        }
        if let Some(audience) = verifier.audience {
            builder = builder.audience(audience);
        }
        if verifier.hs_secret.is_some() {
            builder = builder.hs_secret(verifier.hs_secret);
        }
        if let Some(uri_str) = verifier.jwks_uri {
            let uri = Url::parse(&uri_str)
                .map_err(|e| crate::Error::Config(format!("Invalid JWKS URI: {e}")))?;
            builder = builder.jwks_uri(Some(uri));
        }
        if let Some(secs) = verifier.clock_skew_secs {
            builder = builder.clock_skew(Duration::from_secs(secs));
        }
        if let Some(secs) = verifier.jwks_cache_ttl_secs {
            builder = builder.jwks_cache_ttl(Duration::from_secs(secs));
        }
    }

    if let Some(cache) = config.cache {
        if let Some(enabled) = cache.enabled {
            builder = builder.cache_enabled(enabled);
        }
        if let Some(backend_str) = cache.backend {
            let backend: CacheBackend = backend_str.parse().map_err(crate::Error::Config)?;
            builder = builder.cache_backend(backend);
        }
        if let Some(max) = cache.max_entries {
            builder = builder.cache_max_entries(Some(max));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }
        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    if let Some(directory) = config.directory {
        for org in directory.orgs {
            builder = builder.org(org.id, org.name);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    jwt: Option<JwtFileConfig>,
    org: Option<OrgFileConfig>,
    verifier: Option<VerifierFileConfig>,
    cache: Option<CacheFileConfig>,
    observability: Option<ObservabilityConfig>,
    directory: Option<DirectoryFileConfig>,
}

#[derive(Debug, Deserialize)]
struct JwtFileConfig {
    username_claim: Option<String>,
    email_claim: Option<String>,
    name_claim: Option<String>,
    role_attribute_path: Option<String>,
    groups_attribute_path: Option<String>,
    allow_signup: Option<bool>,
    cache_ttl_minutes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OrgFileConfig {
    auto_assign_org: Option<bool>,
    auto_assign_org_id: Option<i64>,
    default_org_id: Option<i64>,
    org_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct VerifierFileConfig {
    issuer: Option<String>,
    audience: Option<Vec<String>>,
    hs_secret: Option<String>,
    jwks_uri: Option<String>,
    clock_skew_secs: Option<u64>,
    jwks_cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    enabled: Option<bool>,
    backend: Option<String>,
    max_entries: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DirectoryFileConfig {
    #[serde(default)]
    orgs: Vec<OrgEntry>,
}

#[derive(Debug, Deserialize)]
struct OrgEntry {
    id: i64,
    name: String,
}
