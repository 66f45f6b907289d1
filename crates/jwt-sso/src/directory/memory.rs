//! In-memory user and organization store

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{DirectoryError, DirectoryResult};
use crate::identity::{ExternalIdentity, OrgRoles, SignedInUser};
use crate::services::{OrgLookup, SignedInUserLookup, UserUpsert};

pub const MAIN_ORG_ID: i64 = 1;
pub const MAIN_ORG_NAME: &str = "Main Org.";

/// Stored user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Auth module and id of the last external identity linked to the user
    pub auth: Option<(String, String)>,
    pub org_roles: OrgRoles,
}

#[derive(Debug, Default)]
struct State {
    orgs: BTreeMap<i64, String>,
    users: BTreeMap<i64, UserRecord>,
    next_user_id: i64,
}

impl State {
    fn find_user(&self, identity: &ExternalIdentity) -> Option<i64> {
        let by_auth = self.users.values().find(|u| {
            u.auth
                .as_ref()
                .is_some_and(|(module, id)| module == identity.auth_module && *id == identity.auth_id)
        });
        let by_login = || {
            let login = identity.login.as_deref()?;
            self.users.values().find(|u| u.login == login)
        };
        let by_email = || {
            let email = identity.email.as_deref()?;
            self.users.values().find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
        };

        by_auth.or_else(by_login).or_else(by_email).map(|u| u.id)
    }
}

/// Thread-safe user directory backed by maps
///
/// Seeded with the main organization (id 1).
#[derive(Debug)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        let mut orgs = BTreeMap::new();
        orgs.insert(MAIN_ORG_ID, MAIN_ORG_NAME.to_string());
        Self {
            state: RwLock::new(State {
                orgs,
                users: BTreeMap::new(),
                next_user_id: 1,
            }),
        }
    }

    #[must_use]
    pub fn with_org(self, id: i64, name: impl Into<String>) -> Self {
        self.add_org(id, name);
        self
    }

    /// Add or rename an organization
    pub fn add_org(&self, id: i64, name: impl Into<String>) {
        self.state.write().orgs.insert(id, name.into());
    }

    #[must_use]
    pub fn user(&self, id: i64) -> Option<UserRecord> {
        self.state.read().users.get(&id).cloned()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.state.read().users.len()
    }
}

#[async_trait]
impl OrgLookup for InMemoryDirectory {
    async fn org_by_name(&self, name: &str) -> DirectoryResult<i64> {
        self.state
            .read()
            .orgs
            .iter()
            .find(|(_, org)| org.as_str() == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| DirectoryError::OrgNotFound(name.to_string()))
    }
}

#[async_trait]
impl UserUpsert for InMemoryDirectory {
    async fn upsert(&self, identity: &ExternalIdentity, signup_allowed: bool) -> DirectoryResult<i64> {
        if !identity.is_valid() {
            return Err(DirectoryError::InvalidIdentity(
                "login or email is required".to_string(),
            ));
        }

        let mut state = self.state.write();
        let auth = Some((identity.auth_module.to_string(), identity.auth_id.clone()));

        let user_id = if let Some(id) = state.find_user(identity) {
            let Some(user) = state.users.get_mut(&id) else {
                return Err(DirectoryError::UserNotFound(id));
            };
            if let Some(login) = &identity.login {
                user.login.clone_from(login);
            }
            if identity.email.is_some() {
                user.email.clone_from(&identity.email);
            }
            if identity.name.is_some() {
                user.name.clone_from(&identity.name);
            }
            user.auth = auth;
            user.org_roles
                .extend(identity.org_roles.iter().map(|(org, role)| (*org, *role)));
            tracing::debug!(user.id = id, "Updated user from external identity");
            id
        } else {
            if !signup_allowed {
                return Err(DirectoryError::SignupDisabled);
            }
            let id = state.next_user_id;
            state.next_user_id += 1;
            let login = identity
                .login
                .clone()
                .or_else(|| identity.email.clone())
                .unwrap_or_default();
            state.users.insert(
                id,
                UserRecord {
                    id,
                    login,
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                    auth,
                    org_roles: identity.org_roles.clone(),
                },
            );
            tracing::debug!(user.id = id, "Created user from external identity");
            id
        };

        Ok(user_id)
    }
}

#[async_trait]
impl SignedInUserLookup for InMemoryDirectory {
    async fn signed_in_user(&self, org_id: i64, user_id: i64) -> DirectoryResult<SignedInUser> {
        let state = self.state.read();
        let user = state
            .users
            .get(&user_id)
            .ok_or(DirectoryError::UserNotFound(user_id))?;

        let (org_id, org_role) = match user.org_roles.get(&org_id) {
            Some(role) => (org_id, Some(*role)),
            None => user
                .org_roles
                .iter()
                .next()
                .map_or((org_id, None), |(org, role)| (*org, Some(*role))),
        };

        Ok(SignedInUser {
            user_id,
            org_id,
            org_role,
            login: user.login.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        })
    }
}
