//! Token verification
//!
//! [`JwtVerifier`] checks signatures and registered claims (`exp`, `nbf`,
//! `iss`, `aud`) and hands back every claim of the token. HS* tokens use a
//! shared secret; RS*, PS* and ES* tokens use keys from a JWKS endpoint when
//! the `jwks` feature is enabled.

mod config;
mod error;
#[cfg(feature = "jwks")]
mod jwks;
mod jwt;

pub use config::{DEFAULT_CLOCK_SKEW, DEFAULT_JWKS_CACHE_TTL, VerifierConfig};
pub use error::{VerifyError, VerifyResult};
#[cfg(feature = "jwks")]
pub use jwks::{Jwk, JwkSet, JwksCache};
pub use jwt::JwtVerifier;
