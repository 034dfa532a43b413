//! Authentication and session lifecycle.
//!
//! The orchestrator in [`service`] composes four collaborators, each behind a
//! trait so the HTTP layer and tests can swap implementations:
//!
//! - [`password::PasswordHasher`]: salted one-way digests.
//! - [`token::TokenCodec`]: signed access/refresh tokens with independent secrets.
//! - [`users::CredentialStore`]: persisted identities with unique username/email.
//! - [`sessions::SessionRegistry`]: one row per outstanding refresh token.

pub mod model;
pub mod password;
pub mod service;
pub mod sessions;
pub mod token;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use self::model::{PublicUser, SessionRecord};
pub use self::password::{Argon2Hasher, PasswordHasher};
pub use self::service::{AuthOrchestrator, AuthService};
pub use self::sessions::{PgSessionRegistry, SessionRegistry};
pub use self::token::{JwtCodec, TokenCodec, TokenKind};
pub use self::users::{CredentialStore, PgCredentialStore};
