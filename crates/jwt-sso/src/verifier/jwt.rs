//! JWT signature and registered-claim validation

#[cfg(feature = "jwks")]
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode_header};
use serde_json::{Map, Value};

use super::config::VerifierConfig;
use super::error::{VerifyError, VerifyResult};
#[cfg(feature = "jwks")]
use super::jwks::JwksCache;
use crate::claims::ClaimSet;
use crate::services::TokenVerifier;

/// Verifies tokens signed with a shared secret or keys from a JWKS endpoint
pub struct JwtVerifier {
    config: VerifierConfig,
    hs_key: Option<DecodingKey>,
    #[cfg(feature = "jwks")]
    jwks: Option<Arc<JwksCache>>,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("JwtVerifier");
        s.field("issuer", &self.config.issuer)
            .field("has_hs_key", &self.hs_key.is_some());
        #[cfg(feature = "jwks")]
        s.field("has_jwks", &self.jwks.is_some());
        s.finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(config: VerifierConfig) -> VerifyResult<Self> {
        if !config.has_key_source() {
            return Err(VerifyError::Config(
                "either an HS secret or a JWKS URI is required".into(),
            ));
        }

        #[cfg(feature = "jwks")]
        let jwks = config
            .jwks_uri
            .clone()
            .map(|uri| JwksCache::new(uri, config.jwks_cache_ttl).map(Arc::new))
            .transpose()?;

        #[cfg(not(feature = "jwks"))]
        if config.jwks_uri.is_some() {
            return Err(VerifyError::Config(
                "JWKS URI configured but the `jwks` feature is disabled".into(),
            ));
        }

        let hs_key = config
            .hs_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        Ok(Self {
            config,
            hs_key,
            #[cfg(feature = "jwks")]
            jwks,
        })
    }

    /// Validate the token and return its full claim map
    pub async fn validate(&self, token: &str) -> VerifyResult<Map<String, Value>> {
        let header = decode_header(token).map_err(|_| VerifyError::Malformed)?;
        let key = self.decoding_key(header.kid.as_deref(), header.alg).await?;

        let mut validation = Validation::new(header.alg);
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        if self.config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.config.audience);
        }
        validation.leeway = self.config.clock_skew.as_secs();

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn decoding_key(&self, kid: Option<&str>, alg: Algorithm) -> VerifyResult<DecodingKey> {
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => self
                .hs_key
                .clone()
                .ok_or_else(|| VerifyError::Config("HS secret not configured".into())),
            #[cfg(feature = "jwks")]
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384 => {
                let jwks = self.jwks.as_ref().ok_or_else(|| {
                    VerifyError::Config("JWKS not configured for asymmetric algorithm".into())
                })?;
                jwks.get_key(kid, alg).await
            }
            other => {
                let _ = kid;
                Err(VerifyError::UnsupportedAlgorithm(other))
            }
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> VerifyResult<ClaimSet> {
        self.validate(token).await.map(ClaimSet::new)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn mint(claims: &Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier(config: VerifierConfig) -> JwtVerifier {
        JwtVerifier::new(config.with_hs_secret(SECRET)).unwrap()
    }

    #[tokio::test]
    async fn test_verify_returns_all_claims() {
        let v = verifier(VerifierConfig::new().with_issuer("https://idp.example.com"));
        let token = mint(
            &json!({
                "sub": "u1",
                "iss": "https://idp.example.com",
                "exp": now() + 3600,
                "email": "u1@x.com",
                "groups": ["Ops", 3]
            }),
            SECRET,
        );

        let claims = v.verify(&token).await.unwrap();
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.get("email"), Some(&json!("u1@x.com")));
        assert_eq!(claims.get("groups"), Some(&json!(["Ops", 3])));
    }

    #[tokio::test]
    async fn test_issuer_unchecked_when_unset() {
        let v = verifier(VerifierConfig::new());
        let token = mint(&json!({"sub": "u1", "iss": "anyone", "exp": now() + 60}), SECRET);
        assert!(v.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let v = verifier(VerifierConfig::new());
        let token = mint(&json!({"sub": "u1", "exp": now() - 3600}), SECRET);
        assert!(matches!(v.validate(&token).await, Err(VerifyError::Expired)));
    }

    #[tokio::test]
    async fn test_missing_exp_rejected() {
        let v = verifier(VerifierConfig::new());
        let token = mint(&json!({"sub": "u1"}), SECRET);
        assert!(matches!(
            v.validate(&token).await,
            Err(VerifyError::MissingClaim(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let v = verifier(VerifierConfig::new().with_issuer("https://idp.example.com/"));
        let token = mint(
            &json!({"sub": "u1", "iss": "https://evil.example.com", "exp": now() + 60}),
            SECRET,
        );
        assert!(matches!(
            v.validate(&token).await,
            Err(VerifyError::InvalidIssuer)
        ));
    }

    #[tokio::test]
    async fn test_issuer_with_trailing_slash_matches_exactly() {
        let v = verifier(VerifierConfig::new().with_issuer("https://tenant.auth0.com/"));

        let exact = mint(
            &json!({"sub": "u1", "iss": "https://tenant.auth0.com/", "exp": now() + 60}),
            SECRET,
        );
        assert!(v.validate(&exact).await.is_ok());

        let trimmed = mint(
            &json!({"sub": "u1", "iss": "https://tenant.auth0.com", "exp": now() + 60}),
            SECRET,
        );
        assert!(matches!(
            v.validate(&trimmed).await,
            Err(VerifyError::InvalidIssuer)
        ));
    }

    #[tokio::test]
    async fn test_audience() {
        let v = verifier(VerifierConfig::new().with_audience(vec!["app".to_string()]));

        let ok = mint(&json!({"sub": "u1", "aud": "app", "exp": now() + 60}), SECRET);
        assert!(v.validate(&ok).await.is_ok());

        let wrong = mint(&json!({"sub": "u1", "aud": "other", "exp": now() + 60}), SECRET);
        assert!(matches!(
            v.validate(&wrong).await,
            Err(VerifyError::InvalidAudience)
        ));
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let v = verifier(VerifierConfig::new());
        let token = mint(
            &json!({"sub": "u1", "exp": now() + 60}),
            "another-secret-key-at-least-32-bytes",
        );
        assert!(matches!(
            v.validate(&token).await,
            Err(VerifyError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let v = verifier(VerifierConfig::new());
        assert!(matches!(
            v.validate("not.a.valid.token").await,
            Err(VerifyError::Malformed)
        ));
        assert!(matches!(v.validate("").await, Err(VerifyError::Malformed)));
    }

    #[test]
    fn test_requires_key_source() {
        let err = JwtVerifier::new(VerifierConfig::new()).unwrap_err();
        assert!(err.is_internal());
    }

    #[cfg(feature = "jwks")]
    #[tokio::test]
    async fn test_asymmetric_without_jwks_is_config_error() {
        let v = verifier(VerifierConfig::new());
        let err = v.decoding_key(None, Algorithm::RS256).await.unwrap_err();
        assert!(matches!(err, VerifyError::Config(_)));
    }

    #[tokio::test]
    async fn test_eddsa_unsupported() {
        let v = verifier(VerifierConfig::new());
        let err = v.decoding_key(None, Algorithm::EdDSA).await.unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedAlgorithm(Algorithm::EdDSA)));
    }
}
