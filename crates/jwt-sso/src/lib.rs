//! JWT single sign-on login core
//!
//! Resolves a bearer token to a local user id: verify the token, map its
//! claims to an external identity and organization roles, upsert the user and
//! remember the result per token.

pub mod cache;
pub mod claims;
pub mod config;
pub mod directory;
mod error;
pub mod identity;
pub mod login;
pub mod observability;
pub mod report;
pub mod resolver;
pub mod search;
pub mod services;
pub mod verifier;

pub use cache::{
    CacheBackend, CacheConfig, CacheError, CacheKey, CacheNamespace, CacheProvider, CacheResult,
    InMemoryCache, NoopCache, TracedCache, UserIdCache, create_cache,
};
pub use claims::{ClaimExtractor, ClaimSet, ClaimsError};
pub use config::{Config, ConfigBuilder, JwtAuthSettings, OrgPolicy, TelemetryConfig};
pub use directory::{DirectoryError, InMemoryDirectory};
pub use error::{Claim, Error, Result, STATUS_INTERNAL_SERVER_ERROR, STATUS_UNAUTHORIZED};
pub use identity::{AUTH_MODULE, ExternalIdentity, OrgRole, OrgRoles, SignedInUser};
pub use login::{JwtAuthService, JwtAuthServiceBuilder, TokenLogin};
pub use report::{ErrorSink, TracingErrorSink};
pub use resolver::OrgRoleResolver;
pub use search::{Expression, SearchError, SearchResult};
pub use services::{OrgLookup, SignedInUserLookup, TokenVerifier, UserUpsert};
pub use verifier::{JwtVerifier, VerifierConfig, VerifyError};
