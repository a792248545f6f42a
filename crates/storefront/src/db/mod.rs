//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Schemas
//!
//! - `core` - `user` accounts
//! - `store` - catalog (`collection`, `product`, `promotion`, `product_image`,
//!   `review`), customers (`customer`, `address`) and checkout (`cart`,
//!   `cart_item`, `order`, `order_item`)
//! - `tags` - `tag`, `tagged_item`
//! - `likes` - `liked_item`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p storefront-cli -- migrate
//! ```
//!
//! Queries are runtime-checked (`sqlx::query_as` + `FromRow` row types) so the
//! workspace builds without a live database; each repository converts its row
//! types into the domain types in [`crate::models`].

pub mod carts;
pub mod collections;
pub mod customers;
pub mod images;
pub mod likes;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod tags;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use storefront_core::ContentType;

pub use carts::CartRepository;
pub use collections::CollectionRepository;
pub use customers::CustomerRepository;
pub use images::ProductImageRepository;
pub use likes::LikeRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use promotions::PromotionRepository;
pub use reviews::ReviewRepository;
pub use tags::TagRepository;
pub use users::UserRepository;

/// `SQLSTATE` for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The row is still referenced by rows that protect it from deletion.
    #[error("{0}")]
    Protected(String),

    /// A value does not fit its column.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A row referenced by an insert or update does not exist.
    #[error("{0}")]
    InvalidReference(String),
}

impl RepositoryError {
    /// Classify a sqlx error raised by an insert or update.
    ///
    /// Unique violations become `Conflict`, foreign-key violations become
    /// `InvalidReference` with the given message, and numeric overflow becomes
    /// `OutOfRange`. Anything else stays a `Database` error.
    pub(crate) fn from_write(err: sqlx::Error, missing_message: &str) -> Self {
        Self::classify(err, || Self::InvalidReference(missing_message.to_owned()))
    }

    /// Classify a sqlx error raised by a delete.
    ///
    /// A foreign-key violation here means other rows still point at the
    /// deleted one, so it becomes `Protected`.
    pub(crate) fn from_delete(err: sqlx::Error, protected_message: &str) -> Self {
        Self::classify(err, || Self::Protected(protected_message.to_owned()))
    }

    fn classify(err: sqlx::Error, foreign_key: impl FnOnce() -> Self) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return foreign_key();
            }
            if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
                return Self::OutOfRange(db_err.message().to_owned());
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Tables holding generic `(content_type, object_id)` references.
const GENERIC_RELATION_TABLES: [&str; 2] = ["tags.tagged_item", "likes.liked_item"];

/// Delete the tags and likes that point at `object_ids`.
///
/// Generic relations carry no foreign key, so every delete of an attachable
/// object calls this inside its transaction.
pub(crate) async fn forget_objects(
    conn: &mut PgConnection,
    content_type: ContentType,
    object_ids: &[i64],
) -> Result<(), RepositoryError> {
    if object_ids.is_empty() {
        return Ok(());
    }

    for table in GENERIC_RELATION_TABLES {
        sqlx::query(&format!(
            "DELETE FROM {table} WHERE content_type = $1 AND object_id = ANY($2)"
        ))
        .bind(content_type.label())
        .bind(object_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("coffee"), "coffee");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_protected_error_displays_message() {
        let err = RepositoryError::Protected("still referenced".to_owned());
        assert_eq!(err.to_string(), "still referenced");
    }
}
