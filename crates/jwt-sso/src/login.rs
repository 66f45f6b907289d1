//! JWT login orchestration
//!
//! A login either returns the user id remembered for the token, or verifies
//! the token, maps its claims to an [`ExternalIdentity`], resolves
//! organization roles, upserts the user and remembers the result.

use std::sync::Arc;

use crate::cache::{CacheKey, CacheProvider, NoopCache, UserIdCache};
use crate::claims::{ClaimExtractor, ClaimsError};
use crate::config::JwtAuthSettings;
use crate::directory::InMemoryDirectory;
use crate::error::{Claim, Error};
use crate::identity::{ExternalIdentity, SignedInUser};
use crate::report::{ErrorSink, TracingErrorSink};
use crate::resolver::OrgRoleResolver;
use crate::services::{OrgLookup, SignedInUserLookup, TokenVerifier, UserUpsert};
use crate::Result;

/// Login service shared across requests
pub struct JwtAuthService {
    settings: JwtAuthSettings,
    extractor: ClaimExtractor,
    resolver: OrgRoleResolver,
    verifier: Arc<dyn TokenVerifier>,
    users: Arc<dyn UserUpsert>,
    signed_in_users: Arc<dyn SignedInUserLookup>,
    cache: UserIdCache,
    errors: Arc<dyn ErrorSink>,
}

impl std::fmt::Debug for JwtAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthService")
            .field("settings", &self.settings)
            .field("extractor", &self.extractor)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl JwtAuthService {
    #[must_use]
    pub fn builder(settings: JwtAuthSettings) -> JwtAuthServiceBuilder {
        JwtAuthServiceBuilder::new(settings)
    }

    #[must_use]
    pub const fn settings(&self) -> &JwtAuthSettings {
        &self.settings
    }

    /// Start a login for `token`
    ///
    /// The cache key is derived once here and shared by every operation on
    /// the returned handle.
    #[must_use]
    pub fn for_token<'a>(&'a self, token: &'a str) -> TokenLogin<'a> {
        TokenLogin {
            service: self,
            token,
            key: CacheKey::auth_jwt_sync(token),
        }
    }
}

/// Login operations for a single token
pub struct TokenLogin<'a> {
    service: &'a JwtAuthService,
    token: &'a str,
    key: CacheKey,
}

// Omits the raw token
impl std::fmt::Debug for TokenLogin<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLogin")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenLogin<'_> {
    #[must_use]
    pub const fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    /// Resolve the token to a user id
    ///
    /// With `ignore_cache` the remembered id is not consulted, but the
    /// result is still written through. Every failure is reported to the
    /// error sink before it is returned.
    pub async fn login(&self, ignore_cache: bool) -> Result<i64> {
        let result = self.login_inner(ignore_cache).await;

        match &result {
            Ok(user_id) => {
                tracing::debug!(user.id = user_id, cache.key = %self.key, "JWT login succeeded");
            }
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_login("failure");
                self.service
                    .errors
                    .report(e.status_code(), e.public_message(), e);
            }
        }

        result
    }

    async fn login_inner(&self, ignore_cache: bool) -> Result<i64> {
        let service = self.service;

        if !ignore_cache
            && let Some(user_id) = service.cache.get(&self.key).await
            && user_id != 0
        {
            tracing::debug!(user.id = user_id, cache.key = %self.key, "Using cached JWT login");
            #[cfg(feature = "metrics")]
            crate::observability::record_login("cached");
            return Ok(user_id);
        }

        let claims = service.verifier.verify(self.token).await?;

        let subject = claims.subject().ok_or(ClaimsError::MissingSubject)?;
        let mut identity = service.extractor.extract_identity(&claims, subject)?;

        let role = service
            .extractor
            .extract_role(&claims)
            .map_err(|e| Error::extraction(Claim::Role, e))?;
        let groups = service
            .extractor
            .extract_groups(&claims)
            .map_err(|e| Error::extraction(Claim::Groups, e))?;
        tracing::debug!(role = %role, groups = ?groups, "Extracted role and groups");

        identity.org_roles = service.resolver.resolve(&role, &groups).await;
        tracing::debug!(org_roles = ?identity.org_roles, "Resolved organization roles");

        let user_id = self.upsert(&identity).await?;

        if let Err(e) = service.cache.set_if_absent(&self.key, user_id).await {
            tracing::warn!(cache.key = %self.key, error = %e, "Failed to cache JWT login");
        }

        #[cfg(feature = "metrics")]
        crate::observability::record_login("success");

        Ok(user_id)
    }

    async fn upsert(&self, identity: &ExternalIdentity) -> Result<i64> {
        self.service
            .users
            .upsert(identity, self.service.settings.allow_signup)
            .await
            .map_err(Error::UpsertFailed)
    }

    /// Remember `user_id` for this token unless an entry already exists
    pub async fn remember(&self, user_id: i64) -> Result<()> {
        self.service
            .cache
            .set_if_absent(&self.key, user_id)
            .await
            .map_err(Error::from)
    }

    /// Drop the remembered user id for this token
    pub async fn forget(&self) -> Result<()> {
        self.service.cache.delete(&self.key).await.map_err(Error::from)
    }

    /// Signed-in projection of `user_id` in the configured organization
    pub async fn get_signed_in_user(&self, user_id: i64) -> Result<SignedInUser> {
        self.service
            .signed_in_users
            .signed_in_user(self.service.settings.org_id, user_id)
            .await
            .map_err(Error::UserLookupFailed)
    }
}

/// Builder for [`JwtAuthService`]
pub struct JwtAuthServiceBuilder {
    settings: JwtAuthSettings,
    verifier: Option<Arc<dyn TokenVerifier>>,
    orgs: Option<Arc<dyn OrgLookup>>,
    users: Option<Arc<dyn UserUpsert>>,
    signed_in_users: Option<Arc<dyn SignedInUserLookup>>,
    cache: Option<Arc<dyn CacheProvider>>,
    errors: Option<Arc<dyn ErrorSink>>,
}

impl std::fmt::Debug for JwtAuthServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthServiceBuilder")
            .field("settings", &self.settings)
            .field("has_verifier", &self.verifier.is_some())
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl JwtAuthServiceBuilder {
    #[must_use]
    pub const fn new(settings: JwtAuthSettings) -> Self {
        Self {
            settings,
            verifier: None,
            orgs: None,
            users: None,
            signed_in_users: None,
            cache: None,
            errors: None,
        }
    }

    #[must_use]
    pub fn verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    #[must_use]
    pub fn org_lookup(mut self, orgs: Arc<dyn OrgLookup>) -> Self {
        self.orgs = Some(orgs);
        self
    }

    #[must_use]
    pub fn user_upsert(mut self, users: Arc<dyn UserUpsert>) -> Self {
        self.users = Some(users);
        self
    }

    #[must_use]
    pub fn signed_in_user_lookup(mut self, lookup: Arc<dyn SignedInUserLookup>) -> Self {
        self.signed_in_users = Some(lookup);
        self
    }

    /// Use one directory for org lookup, upsert and signed-in user lookup
    #[must_use]
    pub fn directory(self, directory: &Arc<InMemoryDirectory>) -> Self {
        self.org_lookup(directory.clone())
            .user_upsert(directory.clone())
            .signed_in_user_lookup(directory.clone())
    }

    /// Cache backend (default: no caching)
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Failure sink (default: [`TracingErrorSink`])
    #[must_use]
    pub fn error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn build(self) -> Result<JwtAuthService> {
        let extractor = ClaimExtractor::new(&self.settings)
            .map_err(|e| Error::Config(format!("Invalid attribute path: {e}")))?;

        let verifier = self
            .verifier
            .ok_or_else(|| Error::Config("token verifier is required".into()))?;
        let orgs = self
            .orgs
            .ok_or_else(|| Error::Config("organization lookup is required".into()))?;
        let users = self
            .users
            .ok_or_else(|| Error::Config("user upsert is required".into()))?;
        let signed_in_users = self
            .signed_in_users
            .ok_or_else(|| Error::Config("signed-in user lookup is required".into()))?;

        let provider = self
            .cache
            .unwrap_or_else(|| Arc::new(NoopCache::new()));
        let cache = UserIdCache::new(provider, self.settings.cache_ttl);
        let errors = self
            .errors
            .unwrap_or_else(|| Arc::new(TracingErrorSink));

        Ok(JwtAuthService {
            resolver: OrgRoleResolver::new(self.settings.org, orgs),
            settings: self.settings,
            extractor,
            verifier,
            users,
            signed_in_users,
            cache,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::cache::{CacheError, CacheResult, InMemoryCache};
    use crate::claims::ClaimSet;
    use crate::directory::DirectoryError;
    use crate::identity::{OrgRole, OrgRoles};
    use crate::report::testing::RecordingSink;
    use crate::verifier::VerifyError;

    /// Verifier returning fixed claims per token
    #[derive(Default)]
    struct FakeVerifier {
        tokens: HashMap<&'static str, Value>,
        calls: AtomicUsize,
    }

    impl FakeVerifier {
        fn with(tokens: Vec<(&'static str, Value)>) -> Arc<Self> {
            Arc::new(Self {
                tokens: tokens.into_iter().collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenVerifier for FakeVerifier {
        async fn verify(&self, token: &str) -> std::result::Result<ClaimSet, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens
                .get(token)
                .cloned()
                .and_then(ClaimSet::from_value)
                .ok_or(VerifyError::InvalidSignature)
        }
    }

    /// Upsert that records identities and hands out a fixed id
    #[derive(Default)]
    struct RecordingUpsert {
        identities: parking_lot::Mutex<Vec<ExternalIdentity>>,
    }

    #[async_trait]
    impl UserUpsert for RecordingUpsert {
        async fn upsert(
            &self,
            identity: &ExternalIdentity,
            _signup_allowed: bool,
        ) -> std::result::Result<i64, DirectoryError> {
            self.identities.lock().push(identity.clone());
            Ok(42)
        }
    }

    struct Harness {
        service: JwtAuthService,
        verifier: Arc<FakeVerifier>,
        directory: Arc<InMemoryDirectory>,
        sink: Arc<RecordingSink>,
        cache: Arc<InMemoryCache>,
    }

    fn settings() -> JwtAuthSettings {
        JwtAuthSettings {
            email_claim: Some("email".to_string()),
            username_claim: Some("login".to_string()),
            role_attribute_path: Some("role".to_string()),
            allow_signup: true,
            ..Default::default()
        }
    }

    fn harness(settings: JwtAuthSettings, tokens: Vec<(&'static str, Value)>) -> Harness {
        let verifier = FakeVerifier::with(tokens);
        let directory = Arc::new(InMemoryDirectory::new().with_org(2, "ops"));
        let sink = Arc::new(RecordingSink::default());
        let cache = Arc::new(InMemoryCache::new());
        let service = JwtAuthService::builder(settings)
            .verifier(verifier.clone())
            .directory(&directory)
            .cache(cache.clone())
            .error_sink(sink.clone())
            .build()
            .unwrap();
        Harness {
            service,
            verifier,
            directory,
            sink,
            cache,
        }
    }

    fn alice() -> Value {
        json!({"sub": "u1", "email": "u1@x.com", "role": "Admin"})
    }

    #[tokio::test]
    async fn test_login_default_org() {
        let h = harness(settings(), vec![("T", alice())]);

        let user_id = h.service.for_token("T").login(false).await.unwrap();

        let user = h.directory.user(user_id).unwrap();
        assert_eq!(user.org_roles, OrgRoles::from([(1, OrgRole::Admin)]));
        assert_eq!(user.email.as_deref(), Some("u1@x.com"));
        assert_eq!(user.auth, Some(("auth_jwt".to_string(), "u1".to_string())));
        assert!(h.sink.reports().is_empty());
    }

    #[tokio::test]
    async fn test_second_login_uses_cache() {
        let h = harness(settings(), vec![("T", alice())]);

        let first = h.service.for_token("T").login(false).await.unwrap();
        let second = h.service.for_token("T").login(false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.verifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_ignore_cache_reads_nothing_but_writes() {
        let h = harness(settings(), vec![("T", alice())]);
        let login = h.service.for_token("T");

        // A stale entry must not be returned
        h.cache
            .set(login.cache_key(), &999_i64.to_be_bytes(), None)
            .await
            .unwrap();
        let user_id = login.login(true).await.unwrap();
        assert_ne!(user_id, 999);
        assert_eq!(h.verifier.calls(), 1);

        // Fresh token with ignore_cache still writes through
        h.service.for_token("T").forget().await.unwrap();
        h.service.for_token("T").login(true).await.unwrap();
        assert!(h.cache.get(login.cache_key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_verifier() {
        let h = harness(settings(), vec![]);
        let login = h.service.for_token("unknown");
        login.remember(7).await.unwrap();

        assert_eq!(login.login(false).await.unwrap(), 7);
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_zero_id_is_a_miss() {
        let h = harness(settings(), vec![("T", alice())]);
        let login = h.service.for_token("T");
        login.remember(0).await.unwrap();

        let user_id = login.login(false).await.unwrap();
        assert_ne!(user_id, 0);
        assert_eq!(h.verifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_forget_then_login_reverifies() {
        let h = harness(settings(), vec![("T", alice())]);
        let login = h.service.for_token("T");

        login.login(false).await.unwrap();
        login.forget().await.unwrap();
        login.login(false).await.unwrap();

        assert_eq!(h.verifier.calls(), 2);
    }

    #[tokio::test]
    async fn test_forget_absent_entry() {
        let h = harness(settings(), vec![]);
        assert!(h.service.for_token("never").forget().await.is_ok());
    }

    #[tokio::test]
    async fn test_remember_does_not_overwrite() {
        let h = harness(settings(), vec![]);
        let login = h.service.for_token("T");

        login.remember(5).await.unwrap();
        login.remember(6).await.unwrap();

        assert_eq!(login.login(false).await.unwrap(), 5);
    }

    /// Cache backend that fails every operation
    struct UnavailableCache;

    #[async_trait]
    impl CacheProvider for UnavailableCache {
        async fn get(&self, _key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::Connection("unreachable".to_string()))
        }

        async fn set(&self, _key: &CacheKey, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::Connection("unreachable".to_string()))
        }

        async fn delete(&self, _key: &CacheKey) -> CacheResult<bool> {
            Err(CacheError::Connection("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_cache_failures_do_not_fail_login_but_fail_remember_and_forget() {
        let verifier = FakeVerifier::with(vec![("T", alice())]);
        let directory = Arc::new(InMemoryDirectory::new());
        let sink = Arc::new(RecordingSink::default());
        let service = JwtAuthService::builder(settings())
            .verifier(verifier.clone())
            .directory(&directory)
            .cache(Arc::new(UnavailableCache))
            .error_sink(sink.clone())
            .build()
            .unwrap();
        let login = service.for_token("T");

        let user_id = login.login(false).await.unwrap();
        assert!(directory.user(user_id).is_some());
        assert_eq!(login.login(false).await.unwrap(), user_id);
        assert_eq!(verifier.calls(), 2);
        assert!(sink.reports().is_empty());

        let err = login.remember(user_id).await.unwrap_err();
        assert!(err.is_cache());
        assert_eq!(err.status_code(), 500);

        assert!(login.forget().await.unwrap_err().is_cache());
    }

    #[tokio::test]
    async fn test_invalid_token_reported() {
        let h = harness(settings(), vec![]);

        let err = h.service.for_token("bad").login(false).await.unwrap_err();

        assert!(err.is_invalid_token());
        assert_eq!(h.sink.reports(), vec![(401, "Failed to verify JWT".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_sub_fails_before_extraction() {
        // Role path would fail to evaluate if extraction ran
        let settings = JwtAuthSettings {
            role_attribute_path: Some("length(role)".to_string()),
            ..settings()
        };
        let h = harness(settings, vec![("T", json!({"email": "u1@x.com", "role": 3}))]);

        let err = h.service.for_token("T").login(false).await.unwrap_err();

        assert!(matches!(err, Error::InvalidClaims(ClaimsError::MissingSubject)));
        assert_eq!(h.sink.reports()[0].0, 401);
        assert_eq!(h.directory.user_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_login_and_email() {
        let h = harness(settings(), vec![("T", json!({"sub": "u1", "role": "Admin"}))]);

        let err = h.service.for_token("T").login(false).await.unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidClaims(ClaimsError::MissingLoginAndEmail)
        ));
        assert_eq!(
            h.sink.reports(),
            vec![(401, "Failed to get an authentication claim from JWT".to_string())]
        );
    }

    #[tokio::test]
    async fn test_role_path_error_is_extraction_failure() {
        let settings = JwtAuthSettings {
            role_attribute_path: Some("length(role)".to_string()),
            ..settings()
        };
        let h = harness(settings, vec![("T", json!({"sub": "u1", "email": "a@x.com", "role": 3}))]);

        let err = h.service.for_token("T").login(false).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ClaimExtractionFailed {
                claim: Claim::Role,
                ..
            }
        ));
        assert_eq!(
            h.sink.reports(),
            vec![(401, "Failed to extract role from JWT".to_string())]
        );
    }

    #[tokio::test]
    async fn test_groups_path_error_is_extraction_failure() {
        let settings = JwtAuthSettings {
            groups_attribute_path: Some("sort(groups)".to_string()),
            ..settings()
        };
        let h = harness(
            settings,
            vec![("T", json!({"sub": "u1", "email": "a@x.com", "groups": "ops"}))],
        );

        let err = h.service.for_token("T").login(false).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ClaimExtractionFailed {
                claim: Claim::Groups,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_role_still_logs_in() {
        let h = harness(
            settings(),
            vec![("T", json!({"sub": "u1", "email": "a@x.com", "role": "superuser"}))],
        );

        let user_id = h.service.for_token("T").login(false).await.unwrap();

        assert!(h.directory.user(user_id).unwrap().org_roles.is_empty());
    }

    #[tokio::test]
    async fn test_group_lookup_retries_lowercase() {
        let settings = JwtAuthSettings {
            groups_attribute_path: Some("groups".to_string()),
            ..settings()
        };
        let h = harness(
            settings,
            vec![(
                "T",
                json!({"sub": "u1", "email": "a@x.com", "role": "Editor", "groups": ["Ops", 7, "Nope"]}),
            )],
        );

        let user_id = h.service.for_token("T").login(false).await.unwrap();

        assert_eq!(
            h.directory.user(user_id).unwrap().org_roles,
            OrgRoles::from([(2, OrgRole::Editor)])
        );
    }

    #[tokio::test]
    async fn test_auto_assign_org_wins_over_groups() {
        let mut settings = JwtAuthSettings {
            groups_attribute_path: Some("groups".to_string()),
            ..settings()
        };
        settings.org.auto_assign_org = true;
        settings.org.auto_assign_org_id = 3;
        let h = harness(
            settings,
            vec![(
                "T",
                json!({"sub": "u1", "email": "a@x.com", "role": "Viewer", "groups": ["ops"]}),
            )],
        );

        let user_id = h.service.for_token("T").login(false).await.unwrap();

        assert_eq!(
            h.directory.user(user_id).unwrap().org_roles,
            OrgRoles::from([(3, OrgRole::Viewer)])
        );
    }

    #[tokio::test]
    async fn test_signup_disabled_is_upsert_failure() {
        let settings = JwtAuthSettings {
            allow_signup: false,
            ..settings()
        };
        let h = harness(settings, vec![("T", alice())]);

        let err = h.service.for_token("T").login(false).await.unwrap_err();

        assert!(matches!(err, Error::UpsertFailed(DirectoryError::SignupDisabled)));
        assert_eq!(
            h.sink.reports(),
            vec![(401, "Failed to log in as user, specified in JWT".to_string())]
        );
        assert!(h.cache.get(h.service.for_token("T").cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identity_passed_to_upsert() {
        let verifier = FakeVerifier::with(vec![(
            "T",
            json!({"sub": "u1", "login": "alice", "email": "a@x.com", "role": "Admin"}),
        )]);
        let upsert = Arc::new(RecordingUpsert::default());
        let directory = Arc::new(InMemoryDirectory::new());
        let service = JwtAuthService::builder(settings())
            .verifier(verifier)
            .org_lookup(directory.clone())
            .user_upsert(upsert.clone())
            .signed_in_user_lookup(directory)
            .build()
            .unwrap();

        assert_eq!(service.for_token("T").login(false).await.unwrap(), 42);

        let identities = upsert.identities.lock();
        let identity = &identities[0];
        assert_eq!(identity.auth_module, "auth_jwt");
        assert_eq!(identity.auth_id, "u1");
        assert_eq!(identity.login.as_deref(), Some("alice"));
        assert_eq!(identity.org_roles, OrgRoles::from([(1, OrgRole::Admin)]));
    }

    #[tokio::test]
    async fn test_get_signed_in_user() {
        let h = harness(settings(), vec![("T", alice())]);
        let login = h.service.for_token("T");
        let user_id = login.login(false).await.unwrap();

        let user = login.get_signed_in_user(user_id).await.unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.org_id, 1);
        assert_eq!(user.org_role, Some(OrgRole::Admin));

        let err = login.get_signed_in_user(12345).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UserLookupFailed(DirectoryError::UserNotFound(12345))
        ));
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = JwtAuthService::builder(settings()).build().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_builder_rejects_invalid_paths() {
        let settings = JwtAuthSettings {
            groups_attribute_path: Some("groups[".to_string()),
            ..settings()
        };
        let err = JwtAuthService::builder(settings).build().unwrap_err();
        assert!(err.to_string().contains("Invalid attribute path"));
    }
}
