//! Token verification errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    Immature,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("missing required claim: {0}")]
    MissingClaim(String),

    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("no matching key for algorithm")]
    NoMatchingKey,

    #[cfg(feature = "jwks")]
    #[error("JWKS fetch failed: {0}")]
    JwksFetch(#[from] reqwest::Error),

    #[error("JWKS parse failed: {0}")]
    JwksParse(String),

    #[error("token validation failed: {0}")]
    Rejected(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VerifyError {
    /// Failures caused by the verifier's own setup or key source rather than the token
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            #[cfg(feature = "jwks")]
            Self::JwksFetch(_) => true,
            Self::JwksParse(_) | Self::Config(_) => true,
            _ => false,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::Immature,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                Self::Malformed
            }
            _ => Self::Rejected(err.to_string()),
        }
    }
}

pub type VerifyResult<T> = std::result::Result<T, VerifyError>;
