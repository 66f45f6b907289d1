//! Identity types exchanged with the user store

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Auth module tag recorded on identities created from JWT logins
pub const AUTH_MODULE: &str = "auth_jwt";

/// Organization role (hierarchical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrgRole {
    Viewer,
    Editor,
    Admin,
}

impl OrgRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Editor => "Editor",
            Self::Admin => "Admin",
        }
    }
}

impl FromStr for OrgRole {
    type Err = UnknownRole;

    /// Role names are matched exactly; `"admin"` is not a valid role
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Viewer" => Ok(Self::Viewer),
            "Editor" => Ok(Self::Editor),
            "Admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

/// Organization id to role assignments
pub type OrgRoles = BTreeMap<i64, OrgRole>;

/// User identity asserted by the token issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub auth_module: &'static str,
    /// Token subject
    pub auth_id: String,
    pub login: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub org_roles: OrgRoles,
}

impl ExternalIdentity {
    #[must_use]
    pub fn new(auth_id: impl Into<String>) -> Self {
        Self {
            auth_module: AUTH_MODULE,
            auth_id: auth_id.into(),
            login: None,
            email: None,
            name: None,
            org_roles: OrgRoles::new(),
        }
    }

    /// An identity needs a login or an email to be matched to a user
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.login) || present(&self.email)
    }
}

/// Signed-in user projection for a single organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub org_role: Option<OrgRole>,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
}
