//! User domain types.

use chrono::{DateTime, Utc};

use storefront_core::{Email, UserId, Username};

/// A registered account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// Contact email address.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Staff users may write to the catalog and manage every order.
    pub is_staff: bool,
    /// Inactive users cannot obtain tokens.
    pub is_active: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

/// The caller identified by a verified access token.
///
/// Built from token claims only; handlers that need the full [`User`] load it
/// through the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_staff: bool,
}
