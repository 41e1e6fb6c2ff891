//! Identity, sessions and role checks.
//!
//! Passwords are argon2 hashes in Postgres; sessions are opaque bearer tokens
//! kept in Redis with a TTL. Google sign-in goes through `IdentityVerifier`,
//! carried in `AppState` as `Arc<dyn IdentityVerifier>`.

pub mod extractor;
pub mod handlers;
pub mod identity;
pub mod password;
pub mod session;

pub use extractor::AuthUser;
