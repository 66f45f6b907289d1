//! JWT login settings

use std::time::Duration;

use crate::directory::MAIN_ORG_ID;

/// Default lifetime of a token to user id cache entry
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Organization assignment policy for valid roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgPolicy {
    /// Assign every user to `auto_assign_org_id`, ignoring groups
    pub auto_assign_org: bool,
    pub auto_assign_org_id: i64,
    /// Fallback organization when no groups are present
    pub default_org_id: i64,
}

impl Default for OrgPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl OrgPolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            auto_assign_org: false,
            auto_assign_org_id: MAIN_ORG_ID,
            default_org_id: MAIN_ORG_ID,
        }
    }
}

/// Claim mapping and login behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtAuthSettings {
    pub username_claim: Option<String>,
    pub email_claim: Option<String>,
    pub name_claim: Option<String>,
    pub role_attribute_path: Option<String>,
    pub groups_attribute_path: Option<String>,
    /// Create users that do not exist yet
    pub allow_signup: bool,
    pub cache_ttl: Duration,
    pub org: OrgPolicy,
    /// Organization used for signed-in user lookups
    pub org_id: i64,
}

impl Default for JwtAuthSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtAuthSettings {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            username_claim: None,
            email_claim: None,
            name_claim: None,
            role_attribute_path: None,
            groups_attribute_path: None,
            allow_signup: false,
            cache_ttl: DEFAULT_CACHE_TTL,
            org: OrgPolicy::new(),
            org_id: MAIN_ORG_ID,
        }
    }
}
