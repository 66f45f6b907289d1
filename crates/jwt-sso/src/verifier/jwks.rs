//! JWKS fetching and caching

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;
use serde::Deserialize;
use url::Url;

use super::error::{VerifyError, VerifyResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (RSA, EC)
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub r#use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

#[derive(Clone)]
struct KeyEntry {
    key: DecodingKey,
    algorithm: Algorithm,
}

#[derive(Default)]
struct KeyStore {
    by_kid: HashMap<String, KeyEntry>,
    unnamed: Vec<KeyEntry>,
    refreshed_at: Option<Instant>,
}

impl KeyStore {
    fn len(&self) -> usize {
        self.by_kid.len() + self.unnamed.len()
    }

    fn find(&self, kid: Option<&str>, alg: Algorithm) -> VerifyResult<DecodingKey> {
        if let Some(kid) = kid {
            return self
                .by_kid
                .get(kid)
                .filter(|entry| entry.algorithm == alg)
                .map(|entry| entry.key.clone())
                .ok_or_else(|| VerifyError::KeyNotFound(kid.to_string()));
        }

        self.unnamed
            .iter()
            .chain(self.by_kid.values())
            .find(|entry| entry.algorithm == alg)
            .map(|entry| entry.key.clone())
            .ok_or(VerifyError::NoMatchingKey)
    }
}

/// Signing keys fetched from a JWKS endpoint, refreshed lazily after `ttl`
pub struct JwksCache {
    store: RwLock<KeyStore>,
    jwks_uri: Url,
    client: reqwest::Client,
    ttl: Duration,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_uri", &self.jwks_uri)
            .field("ttl", &self.ttl)
            .field("keys_count", &self.store.read().len())
            .finish_non_exhaustive()
    }
}

impl JwksCache {
    pub fn new(jwks_uri: Url, ttl: Duration) -> VerifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| VerifyError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            store: RwLock::new(KeyStore::default()),
            jwks_uri,
            client,
            ttl,
        })
    }

    #[must_use]
    pub const fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Key for `kid`, or the first key for `alg` when the token names none
    pub async fn get_key(&self, kid: Option<&str>, alg: Algorithm) -> VerifyResult<DecodingKey> {
        if self.needs_refresh() {
            self.refresh().await?;
        }
        self.store.read().find(kid, alg)
    }

    pub async fn refresh(&self) -> VerifyResult<()> {
        tracing::debug!(jwks_uri = %self.jwks_uri, "Refreshing JWKS");

        let jwks: JwkSet = self
            .client
            .get(self.jwks_uri.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| VerifyError::JwksParse(e.to_string()))?;

        let count = self.install(&jwks)?;
        tracing::info!(keys_count = count, "JWKS refreshed");
        Ok(())
    }

    /// Replace the cached keys; returns how many usable keys were loaded
    pub fn install(&self, jwks: &JwkSet) -> VerifyResult<usize> {
        let mut store = KeyStore::default();
        for jwk in &jwks.keys {
            let Some((key, algorithm)) = decode_jwk(jwk)? else {
                continue;
            };
            let entry = KeyEntry { key, algorithm };
            match &jwk.kid {
                Some(kid) => {
                    store.by_kid.insert(kid.clone(), entry);
                }
                None => store.unnamed.push(entry),
            }
        }
        store.refreshed_at = Some(Instant::now());

        let count = store.len();
        *self.store.write() = store;
        Ok(count)
    }

    fn needs_refresh(&self) -> bool {
        self.store
            .read()
            .refreshed_at
            .is_none_or(|t| t.elapsed() > self.ttl)
    }
}

fn decode_jwk(jwk: &Jwk) -> VerifyResult<Option<(DecodingKey, Algorithm)>> {
    if jwk.r#use.as_deref().is_some_and(|u| u != "sig") {
        return Ok(None);
    }

    let alg = match jwk.alg.as_deref() {
        Some("RS256") => Algorithm::RS256,
        Some("RS384") => Algorithm::RS384,
        Some("RS512") => Algorithm::RS512,
        Some("PS256") => Algorithm::PS256,
        Some("PS384") => Algorithm::PS384,
        Some("PS512") => Algorithm::PS512,
        Some("ES256") => Algorithm::ES256,
        Some("ES384") => Algorithm::ES384,
        None => match (jwk.kty.as_str(), jwk.crv.as_deref()) {
            ("RSA", _) => Algorithm::RS256,
            ("EC", Some("P-256")) => Algorithm::ES256,
            ("EC", Some("P-384")) => Algorithm::ES384,
            _ => return Ok(None),
        },
        Some(other) => {
            tracing::debug!(alg = other, "Skipping key with unsupported algorithm");
            return Ok(None);
        }
    };

    let key = match jwk.kty.as_str() {
        "RSA" => DecodingKey::from_rsa_components(
            component(jwk.n.as_deref(), "n", &jwk.kty)?,
            component(jwk.e.as_deref(), "e", &jwk.kty)?,
        )
        .map_err(|e| VerifyError::JwksParse(format!("Invalid RSA components: {e}")))?,
        "EC" => DecodingKey::from_ec_components(
            component(jwk.x.as_deref(), "x", &jwk.kty)?,
            component(jwk.y.as_deref(), "y", &jwk.kty)?,
        )
        .map_err(|e| VerifyError::JwksParse(format!("Invalid EC components: {e}")))?,
        other => {
            tracing::debug!(kty = other, "Skipping unsupported key type");
            return Ok(None);
        }
    };

    Ok(Some((key, alg)))
}

fn component<'a>(value: Option<&'a str>, name: &str, kty: &str) -> VerifyResult<&'a str> {
    value.ok_or_else(|| VerifyError::JwksParse(format!("Missing '{name}' in {kty} key")))
}
