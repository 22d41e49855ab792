//! Authentication primitives.
//!
//! Users are managed by the surrounding platform; this service only verifies
//! the access tokens it issues.

pub mod jwt;

/// Role allowed to operate the embedding worker.
pub const ROLE_ADMIN: &str = "admin";
/// Default role for players.
pub const ROLE_USER: &str = "user";
