//! User and organization store
//!
//! The login flow only needs the [`crate::services`] traits; [`InMemoryDirectory`]
//! implements all of them for the command-line tool and tests.

mod error;
mod memory;

pub use error::{DirectoryError, DirectoryResult};
pub use memory::{InMemoryDirectory, MAIN_ORG_ID, MAIN_ORG_NAME, UserRecord};
