//! Collaborators the login flow depends on
//!
//! Each is a single async call with no retry. Implementations are injected
//! into [`crate::login::JwtAuthService`] as trait objects.

use async_trait::async_trait;

use crate::claims::ClaimSet;
use crate::directory::DirectoryError;
use crate::identity::{ExternalIdentity, SignedInUser};
use crate::verifier::VerifyError;

/// Verifies a raw token and returns its claims
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ClaimSet, VerifyError>;
}

/// Resolves an organization name to its id
#[async_trait]
pub trait OrgLookup: Send + Sync {
    /// Names are matched exactly
    async fn org_by_name(&self, name: &str) -> Result<i64, DirectoryError>;
}

/// Creates or updates the user behind an external identity
#[async_trait]
pub trait UserUpsert: Send + Sync {
    /// Returns the user id; fails with `SignupDisabled` for unknown users
    /// when `signup_allowed` is false
    async fn upsert(
        &self,
        identity: &ExternalIdentity,
        signup_allowed: bool,
    ) -> Result<i64, DirectoryError>;
}

/// Loads the signed-in projection of a user within an organization
#[async_trait]
pub trait SignedInUserLookup: Send + Sync {
    async fn signed_in_user(&self, org_id: i64, user_id: i64)
    -> Result<SignedInUser, DirectoryError>;
}
