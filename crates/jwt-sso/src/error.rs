use std::fmt;

use thiserror::Error;

use crate::cache::CacheError;
use crate::claims::ClaimsError;
use crate::directory::DirectoryError;
use crate::search::SearchError;
use crate::verifier::VerifyError;

pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Claim whose attribute path failed to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Role,
    Groups,
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Role => "role",
            Self::Groups => "groups",
        })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to verify JWT: {0}")]
    InvalidToken(#[from] VerifyError),

    #[error("Failed to get an authentication claim from JWT: {0}")]
    InvalidClaims(#[from] ClaimsError),

    #[error("Failed to extract {claim} from JWT: {source}")]
    ClaimExtractionFailed {
        claim: Claim,
        #[source]
        source: SearchError,
    },

    #[error("Failed to log in as user, specified in JWT: {0}")]
    UpsertFailed(#[source] DirectoryError),

    #[error("Failed to load signed-in user: {0}")]
    UserLookupFailed(#[source] DirectoryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub const fn extraction(claim: Claim, source: SearchError) -> Self {
        Self::ClaimExtractionFailed { claim, source }
    }

    #[must_use]
    pub const fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken(_))
    }

    #[must_use]
    pub const fn is_invalid_claims(&self) -> bool {
        matches!(self, Self::InvalidClaims(_))
    }

    #[must_use]
    pub const fn is_extraction_failed(&self) -> bool {
        matches!(self, Self::ClaimExtractionFailed { .. })
    }

    #[must_use]
    pub const fn is_upsert_failed(&self) -> bool {
        matches!(self, Self::UpsertFailed(_))
    }

    #[must_use]
    pub const fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// HTTP status reported for this failure
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken(_)
            | Self::InvalidClaims(_)
            | Self::ClaimExtractionFailed { .. }
            | Self::UpsertFailed(DirectoryError::SignupDisabled) => STATUS_UNAUTHORIZED,
            _ => STATUS_INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller; never includes token contents
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "Failed to verify JWT",
            Self::InvalidClaims(_) => "Failed to get an authentication claim from JWT",
            Self::ClaimExtractionFailed {
                claim: Claim::Role, ..
            } => "Failed to extract role from JWT",
            Self::ClaimExtractionFailed {
                claim: Claim::Groups,
                ..
            } => "Failed to extract groups from JWT",
            Self::UpsertFailed(_) => "Failed to log in as user, specified in JWT",
            Self::UserLookupFailed(_) => "Failed to load signed-in user",
            Self::Cache(_) => "Failed to update JWT login cache",
            Self::Config(_) => "JWT authentication is misconfigured",
        }
    }
}
