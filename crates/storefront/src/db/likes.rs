//! Like repository.

use sqlx::PgPool;

use storefront_core::{ContentType, LikedItemId, UserId};

use super::RepositoryError;
use crate::models::LikedItem;

#[derive(sqlx::FromRow)]
struct LikedItemRow {
    id: i64,
    user_id: i64,
    content_type: String,
    object_id: i64,
}

impl TryFrom<LikedItemRow> for LikedItem {
    type Error = RepositoryError;

    fn try_from(r: LikedItemRow) -> Result<Self, Self::Error> {
        let content_type = r.content_type.parse::<ContentType>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid content type in database: {e}"))
        })?;

        Ok(Self {
            id: LikedItemId::new(r.id),
            user_id: UserId::new(r.user_id),
            content_type,
            object_id: r.object_id,
        })
    }
}

/// Repository for likes.
pub struct LikeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LikeRepository<'a> {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Like an object. Liking it again returns the existing like.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn like(
        &self,
        user_id: UserId,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<LikedItem, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, LikedItemRow>(
            r"
            INSERT INTO likes.liked_item (user_id, content_type, object_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, content_type, object_id)
            DO UPDATE SET object_id = EXCLUDED.object_id
            RETURNING id, user_id, content_type, object_id
            ",
        )
        .bind(user_id)
        .bind(content_type.label())
        .bind(object_id)
        .fetch_one(self.pool)
        .await?;

        LikedItem::try_from(row)
    }

    /// Remove a like. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unlike(
        &self,
        user_id: UserId,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM likes.liked_item WHERE user_id = $1 AND content_type = $2 AND object_id = $3",
        )
        .bind(user_id)
        .bind(content_type.label())
        .bind(object_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Everything a user has liked, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<LikedItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, LikedItemRow>(
            r"
            SELECT id, user_id, content_type, object_id
            FROM likes.liked_item
            WHERE user_id = $1
            ORDER BY id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(LikedItem::try_from).collect()
    }
}
