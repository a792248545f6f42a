//! User repository for database operations.
//!
//! Creating a user also creates its customer profile in the same transaction,
//! so every account has exactly one `store.customer` row from the moment it
//! exists.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storefront_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

/// Input for [`UserRepository::create_with_customer`].
#[derive(Debug)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&r.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(r.id),
            username,
            email,
            first_name: r.first_name,
            last_name: r.last_name,
            is_staff: r.is_staff,
            is_active: r.is_active,
            date_joined: r.date_joined,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, is_active, date_joined";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM core."user" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user and their password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            r#"SELECT {USER_COLUMNS}, password_hash FROM core."user" WHERE username = $1"#
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a user and its customer profile in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("username" | "email")` if the value is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_customer(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO core."user"
                (username, email, password_hash, first_name, last_name, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username.as_str())
        .bind(new.email.as_str())
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique)?;

        sqlx::query("INSERT INTO store.customer (user_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        User::try_from(row)
    }

    /// Update email and names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("email")` if the email is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE core."user"
            SET email = $2, first_name = $3, last_name = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(email.as_str())
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique)?;

        row.map(User::try_from).transpose()
    }

    /// Whether a username is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM core."user" WHERE username = $1)"#,
        )
        .bind(username.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// Map a unique violation to `Conflict` naming the offending field.
fn map_unique(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = if db_err.constraint() == Some("user_email_key") {
            "email"
        } else {
            "username"
        };
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(e)
}
