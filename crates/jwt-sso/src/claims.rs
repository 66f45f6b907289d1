//! Verified claim sets and claim extraction

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::JwtAuthSettings;
use crate::identity::ExternalIdentity;
use crate::search::{Expression, SearchResult};

/// Claim set validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("missing subject claim")]
    MissingSubject,

    #[error("missing login and email claims")]
    MissingLoginAndEmail,
}

/// Claims of a verified token
///
/// Always a JSON object; read-only once produced by the verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet(Value);

impl ClaimSet {
    #[must_use]
    pub const fn new(claims: Map<String, Value>) -> Self {
        Self(Value::Object(claims))
    }

    /// Returns `None` unless `value` is a JSON object
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// The `sub` claim, when present as a non-empty string
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self.get("sub") {
            Some(Value::String(sub)) if !sub.is_empty() => Some(sub),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(claims: Map<String, Value>) -> Self {
        Self::new(claims)
    }
}

/// Identity claim reference: a top-level claim name that may also be a path
#[derive(Debug, Clone)]
struct IdentityClaim {
    name: String,
    path: Option<Expression>,
}

impl IdentityClaim {
    fn new(name: Option<&str>) -> Option<Self> {
        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        Some(Self {
            name: name.to_string(),
            path: Expression::compile(name).ok(),
        })
    }

    /// Exact claim names win over path evaluation; search failures and
    /// non-strings read as absent
    fn lookup(&self, claims: &ClaimSet) -> Option<String> {
        let value = match claims.get(&self.name) {
            Some(value) => Some(value.clone()),
            None => match self.path.as_ref()?.search(claims.as_value()) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(claim = %self.name, error = %e, "Identity claim search failed");
                    None
                }
            },
        };
        match value {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Extracts identity, role and group claims using configured attribute paths
#[derive(Debug, Clone, Default)]
pub struct ClaimExtractor {
    username: Option<IdentityClaim>,
    email: Option<IdentityClaim>,
    name: Option<IdentityClaim>,
    role: Option<Expression>,
    groups: Option<Expression>,
}

impl ClaimExtractor {
    /// Compiles the role and groups paths; unset or blank paths are skipped
    pub fn new(settings: &JwtAuthSettings) -> SearchResult<Self> {
        Ok(Self {
            username: IdentityClaim::new(settings.username_claim.as_deref()),
            email: IdentityClaim::new(settings.email_claim.as_deref()),
            name: IdentityClaim::new(settings.name_claim.as_deref()),
            role: compile(settings.role_attribute_path.as_deref())?,
            groups: compile(settings.groups_attribute_path.as_deref())?,
        })
    }

    /// Role claim as a string; `""` when unconfigured, absent or not a string
    pub fn extract_role(&self, claims: &ClaimSet) -> SearchResult<String> {
        let Some(path) = &self.role else {
            return Ok(String::new());
        };
        Ok(match path.search(claims.as_value())? {
            Some(Value::String(role)) => role,
            _ => String::new(),
        })
    }

    /// String elements of the groups claim, in order
    ///
    /// Anything other than an array yields an empty list; non-string elements
    /// are dropped.
    pub fn extract_groups(&self, claims: &ClaimSet) -> SearchResult<Vec<String>> {
        let Some(path) = &self.groups else {
            return Ok(Vec::new());
        };
        Ok(match path.search(claims.as_value())? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(group) => Some(group),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Build the external identity for `subject` from the login/email/name claims
    pub fn extract_identity(
        &self,
        claims: &ClaimSet,
        subject: &str,
    ) -> Result<ExternalIdentity, ClaimsError> {
        let mut identity = ExternalIdentity::new(subject);
        identity.login = self.username.as_ref().and_then(|c| c.lookup(claims));
        identity.email = self.email.as_ref().and_then(|c| c.lookup(claims));
        identity.name = self.name.as_ref().and_then(|c| c.lookup(claims));

        if identity.is_valid() {
            Ok(identity)
        } else {
            Err(ClaimsError::MissingLoginAndEmail)
        }
    }
}

fn compile(path: Option<&str>) -> SearchResult<Option<Expression>> {
    match path.map(str::trim) {
        Some(path) if !path.is_empty() => Expression::compile(path).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn claims(value: Value) -> ClaimSet {
        ClaimSet::from_value(value).unwrap()
    }

    fn settings() -> JwtAuthSettings {
        JwtAuthSettings {
            username_claim: Some("login".to_string()),
            email_claim: Some("email".to_string()),
            name_claim: Some("name".to_string()),
            role_attribute_path: Some("role".to_string()),
            groups_attribute_path: Some("groups".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_claim_set_subject() {
        assert_eq!(claims(json!({"sub": "u1"})).subject(), Some("u1"));
        assert_eq!(claims(json!({"sub": ""})).subject(), None);
        assert_eq!(claims(json!({"sub": 42})).subject(), None);
        assert_eq!(claims(json!({})).subject(), None);
    }

    #[test]
    fn test_claim_set_requires_object() {
        assert!(ClaimSet::from_value(json!(["a"])).is_none());
        assert!(ClaimSet::from_value(json!("x")).is_none());
    }

    #[test]
    fn test_extract_role() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        assert_eq!(
            extractor.extract_role(&claims(json!({"role": "Admin"}))).unwrap(),
            "Admin"
        );
        assert_eq!(extractor.extract_role(&claims(json!({}))).unwrap(), "");
        assert_eq!(
            extractor.extract_role(&claims(json!({"role": ["Admin"]}))).unwrap(),
            ""
        );
    }

    #[test]
    fn test_extract_role_without_path() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            role_attribute_path: Some("  ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            extractor.extract_role(&claims(json!({"role": "Admin"}))).unwrap(),
            ""
        );
    }

    #[test]
    fn test_extract_role_with_expression() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            role_attribute_path: Some(
                "contains(groups[*], 'admins') && 'Admin' || 'Viewer'".to_string(),
            ),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            extractor
                .extract_role(&claims(json!({"groups": ["admins"]})))
                .unwrap(),
            "Admin"
        );
        assert_eq!(
            extractor.extract_role(&claims(json!({"groups": []}))).unwrap(),
            "Viewer"
        );
    }

    #[test]
    fn test_extract_role_search_error() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            role_attribute_path: Some("length(role)".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(extractor.extract_role(&claims(json!({}))).is_err());
    }

    #[test]
    fn test_extract_groups_keeps_strings_in_order() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        let groups = extractor
            .extract_groups(&claims(json!({"groups": ["Ops", 1, null, "Dev", {"x": 1}]})))
            .unwrap();
        assert_eq!(groups, vec!["Ops", "Dev"]);
    }

    #[test]
    fn test_extract_groups_object_is_empty() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        let groups = extractor
            .extract_groups(&claims(json!({"groups": {"Ops": true}})))
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_extract_groups_without_path() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings::default()).unwrap();
        let groups = extractor
            .extract_groups(&claims(json!({"groups": ["Ops"]})))
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_extract_identity() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        let identity = extractor
            .extract_identity(
                &claims(json!({"sub": "u1", "login": "alice", "email": "a@x.com", "name": "Alice"})),
                "u1",
            )
            .unwrap();

        assert_eq!(identity.auth_id, "u1");
        assert_eq!(identity.login.as_deref(), Some("alice"));
        assert_eq!(identity.email.as_deref(), Some("a@x.com"));
        assert_eq!(identity.name.as_deref(), Some("Alice"));
        assert!(identity.org_roles.is_empty());
    }

    #[test]
    fn test_extract_identity_email_only() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        let identity = extractor
            .extract_identity(&claims(json!({"sub": "u1", "email": "a@x.com"})), "u1")
            .unwrap();
        assert!(identity.login.is_none());
        assert_eq!(identity.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_extract_identity_missing_login_and_email() {
        let extractor = ClaimExtractor::new(&settings()).unwrap();
        let err = extractor
            .extract_identity(&claims(json!({"sub": "u1", "login": 7, "email": ""})), "u1")
            .unwrap_err();
        assert_eq!(err, ClaimsError::MissingLoginAndEmail);
    }

    #[test]
    fn test_extract_identity_nested_paths() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            email_claim: Some("profile.emails[0]".to_string()),
            ..Default::default()
        })
        .unwrap();
        let identity = extractor
            .extract_identity(
                &claims(json!({"sub": "u1", "profile": {"emails": ["p@x.com", "q@x.com"]}})),
                "u1",
            )
            .unwrap();
        assert_eq!(identity.email.as_deref(), Some("p@x.com"));
    }

    #[test]
    fn test_extract_identity_claim_name_not_a_path() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            email_claim: Some("https://example.com/email".to_string()),
            ..Default::default()
        })
        .unwrap();
        let identity = extractor
            .extract_identity(
                &claims(json!({"sub": "u1", "https://example.com/email": "u1@x.com"})),
                "u1",
            )
            .unwrap();
        assert_eq!(identity.email.as_deref(), Some("u1@x.com"));
    }

    #[test]
    fn test_extract_identity_search_error_is_absent() {
        let extractor = ClaimExtractor::new(&JwtAuthSettings {
            username_claim: Some("length(nickname)".to_string()),
            email_claim: Some("email".to_string()),
            ..Default::default()
        })
        .unwrap();
        let identity = extractor
            .extract_identity(&claims(json!({"sub": "u1", "email": "u1@x.com"})), "u1")
            .unwrap();
        assert!(identity.login.is_none());
    }

    #[test]
    fn test_invalid_path_rejected_at_construction() {
        let result = ClaimExtractor::new(&JwtAuthSettings {
            groups_attribute_path: Some("groups[".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
