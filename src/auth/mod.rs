//! Identity service primitives
//!
//! Password hashing and session-token issuance for the HTTP identity
//! endpoints. The signaling relay itself never consumes these; it trusts
//! the identity a connection claims at registration time.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{SessionClaims, TokenService};

use thiserror::Error;

/// Errors from the identity service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),
}
