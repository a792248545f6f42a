//! Authentication error types.

use thiserror::Error;

use super::jwt::JwtError;
use crate::db::RepositoryError;
use crate::validation::ValidationErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// One or more registration or profile fields are invalid.
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token's user no longer exists or was deactivated.
    #[error("user not found")]
    UserNotFound,

    /// Username or email already taken. Holds the conflicting field.
    #[error("user already exists: {0}")]
    UserAlreadyExists(&'static str),

    /// A presented token failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(JwtError),

    /// A token could not be issued.
    #[error("token issue failed: {0}")]
    TokenIssue(JwtError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
