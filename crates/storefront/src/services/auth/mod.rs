//! Authentication service.
//!
//! Provides account registration, password login and the JWT token pair.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtError, JwtKeys, TokenPair, TokenType};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use storefront_core::{Email, UserId, Username};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;
use crate::validation::{ValidationErrors, check_text};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of first and last names.
const MAX_NAME_LENGTH: usize = 150;

/// Registration input as received from the client.
#[derive(Debug, Default, serde::Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Only honoured by the CLI; the HTTP handler always clears it.
    #[serde(skip)]
    pub is_staff: bool,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Authentication service.
///
/// Handles user registration, login, and token refresh/verification.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    keys: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, keys: &'a JwtKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            keys,
        }
    }

    /// Register a new user together with its customer profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` listing every invalid field.
    /// Returns `AuthError::UserAlreadyExists` if the username or email is taken.
    pub async fn register(&self, input: Registration) -> Result<User, AuthError> {
        register_with(&self.users, input).await
    }

    /// Login with username and password, returning a fresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong or the account is inactive.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        self.keys
            .issue_pair(user.id, user.is_staff)
            .map_err(AuthError::TokenIssue)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The staff flag is re-read from the database so demotions take effect
    /// on the next refresh.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is not a valid refresh token.
    /// Returns `AuthError::UserNotFound` if the user is gone or inactive.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self
            .keys
            .verify(refresh_token, TokenType::Refresh)
            .map_err(AuthError::InvalidToken)?;

        let user = self.get_user(claims.user_id).await?;
        if !user.is_active {
            return Err(AuthError::UserNotFound);
        }

        self.keys
            .issue_access(user.id, user.is_staff)
            .map_err(AuthError::TokenIssue)
    }

    /// Check that a token of either type is valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if verification fails.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.keys.verify_any(token).map_err(AuthError::InvalidToken)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the caller's own email and names. Absent fields are kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for invalid fields.
    /// Returns `AuthError::UserAlreadyExists` if the new email is taken.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let current = self.get_user(user_id).await?;
        let mut errors = ValidationErrors::new();

        let email = match update.email {
            Some(e) => errors.check("email", Email::parse(&e)),
            None => Some(current.email),
        };
        let first_name = match update.first_name {
            Some(n) => check_name(&mut errors, "first_name", n),
            None => Some(current.first_name),
        };
        let last_name = match update.last_name {
            Some(n) => check_name(&mut errors, "last_name", n),
            None => Some(current.last_name),
        };

        errors.finish()?;
        let (Some(email), Some(first_name), Some(last_name)) = (email, first_name, last_name)
        else {
            return Err(AuthError::Validation(ValidationErrors::new()));
        };

        self.users
            .update_profile(user_id, &email, &first_name, &last_name)
            .await
            .map_err(map_conflict)?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Register a user without a token service (used by the CLI).
///
/// # Errors
///
/// Same as [`AuthService::register`].
pub async fn register_user(pool: &PgPool, input: Registration) -> Result<User, AuthError> {
    register_with(&UserRepository::new(pool), input).await
}

/// Validate a registration and create the user and its customer.
///
/// # Errors
///
/// Returns `AuthError::Validation` listing every invalid field.
/// Returns `AuthError::UserAlreadyExists` if the username or email is taken.
async fn register_with(users: &UserRepository<'_>, input: Registration) -> Result<User, AuthError> {
    let mut errors = ValidationErrors::new();

    let username = errors
        .require("username", input.username)
        .and_then(|u| errors.check("username", Username::parse(&u)));
    let email = errors
        .require("email", input.email)
        .and_then(|e| errors.check("email", Email::parse(&e)));
    let password = errors
        .require("password", input.password)
        .and_then(|p| errors.check("password", validate_password(&p).map(|()| p)));
    let first_name = check_name(&mut errors, "first_name", input.first_name);
    let last_name = check_name(&mut errors, "last_name", input.last_name);

    errors.finish()?;
    let (Some(username), Some(email), Some(password), Some(first_name), Some(last_name)) =
        (username, email, password, first_name, last_name)
    else {
        return Err(AuthError::Validation(ValidationErrors::new()));
    };

    let password_hash = hash_password(&password)?;

    let user = users
        .create_with_customer(&NewUser {
            username,
            email,
            password_hash,
            first_name,
            last_name,
            is_staff: input.is_staff,
        })
        .await
        .map_err(map_conflict)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(user)
}

/// Names may be empty but not longer than [`MAX_NAME_LENGTH`].
fn check_name(errors: &mut ValidationErrors, field: &str, value: String) -> Option<String> {
    if value.trim().is_empty() {
        return Some(String::new());
    }
    check_text(errors, field, Some(value), MAX_NAME_LENGTH)
}

fn map_conflict(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(field) if field == "email" => {
            AuthError::UserAlreadyExists("email")
        }
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists("username"),
        other => AuthError::Repository(other),
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns a message describing the first unmet requirement.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_owned());
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("correct horse").is_ok());
        assert!(validate_password("short").unwrap_err().contains("at least 8"));
        assert_eq!(
            validate_password("12345678").unwrap_err(),
            "This password is entirely numeric."
        );
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2hunter2", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_check_name_allows_blank() {
        let mut errors = ValidationErrors::new();
        assert_eq!(check_name(&mut errors, "first_name", String::new()), Some(String::new()));
        assert_eq!(
            check_name(&mut errors, "first_name", " Ada ".to_owned()),
            Some("Ada".to_owned())
        );
        assert!(check_name(&mut errors, "last_name", "x".repeat(151)).is_none());
        assert!(errors.get("last_name").is_some());
    }

    #[test]
    fn test_map_conflict() {
        assert!(matches!(
            map_conflict(RepositoryError::Conflict("email".to_owned())),
            AuthError::UserAlreadyExists("email")
        ));
        assert!(matches!(
            map_conflict(RepositoryError::Conflict("username".to_owned())),
            AuthError::UserAlreadyExists("username")
        ));
        assert!(matches!(
            map_conflict(RepositoryError::NotFound),
            AuthError::Repository(RepositoryError::NotFound)
        ));
    }
}
