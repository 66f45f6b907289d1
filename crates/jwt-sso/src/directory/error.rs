//! User and organization store errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("organization not found: {0}")]
    OrgNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(i64),

    #[error("user sign up is disabled")]
    SignupDisabled,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::OrgNotFound(_) | Self::UserNotFound(_))
    }
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
