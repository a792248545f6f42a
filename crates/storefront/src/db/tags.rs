//! Tag repository: labels and their generic attachments.

use sqlx::PgPool;

use storefront_core::{ContentType, TagId, TaggedItemId};

use super::RepositoryError;
use crate::models::{Tag, TaggedItem};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    label: String,
}

impl From<TagRow> for Tag {
    fn from(r: TagRow) -> Self {
        Self {
            id: TagId::new(r.id),
            label: r.label,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaggedItemRow {
    id: i64,
    tag_id: i64,
    label: String,
    content_type: String,
    object_id: i64,
}

impl TryFrom<TaggedItemRow> for TaggedItem {
    type Error = RepositoryError;

    fn try_from(r: TaggedItemRow) -> Result<Self, Self::Error> {
        let content_type = r.content_type.parse::<ContentType>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid content type in database: {e}"))
        })?;

        Ok(Self {
            id: TaggedItemId::new(r.id),
            tag: Tag {
                id: TagId::new(r.tag_id),
                label: r.label,
            },
            content_type,
            object_id: r.object_id,
        })
    }
}

/// Whether the object a generic relation points at exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn object_exists(
    pool: &PgPool,
    content_type: ContentType,
    object_id: i64,
) -> Result<bool, RepositoryError> {
    // The table name comes from a closed enum, never from the request.
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        content_type.table()
    ))
    .bind(object_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Repository for tags.
pub struct TagRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TagRepository<'a> {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All tags ordered by label.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, label FROM tags.tag ORDER BY label, id")
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    /// Find a tag by exact label.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_label(&self, label: &str) -> Result<Option<Tag>, RepositoryError> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT id, label FROM tags.tag WHERE label = $1 ORDER BY id LIMIT 1",
        )
        .bind(label)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Tag::from))
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, label: &str) -> Result<Tag, RepositoryError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags.tag (label) VALUES ($1) RETURNING id, label",
        )
        .bind(label)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Tags attached to one object.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_model(
        &self,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<Vec<TaggedItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, TaggedItemRow>(
            r"
            SELECT ti.id, ti.tag_id, t.label, ti.content_type, ti.object_id
            FROM tags.tagged_item ti
            JOIN tags.tag t ON t.id = ti.tag_id
            WHERE ti.content_type = $1 AND ti.object_id = $2
            ORDER BY ti.id
            ",
        )
        .bind(content_type.label())
        .bind(object_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TaggedItem::try_from).collect()
    }

    /// Attach a tag to an object.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag does not exist.
    pub async fn attach(
        &self,
        tag_id: TagId,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<TaggedItem, RepositoryError> {
        let row = sqlx::query_as::<_, TaggedItemRow>(
            r"
            WITH inserted AS (
                INSERT INTO tags.tagged_item (tag_id, content_type, object_id)
                VALUES ($1, $2, $3)
                RETURNING id, tag_id, content_type, object_id
            )
            SELECT i.id, i.tag_id, t.label, i.content_type, i.object_id
            FROM inserted i
            JOIN tags.tag t ON t.id = i.tag_id
            ",
        )
        .bind(tag_id)
        .bind(content_type.label())
        .bind(object_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_write(e, "") {
            RepositoryError::InvalidReference(_) => RepositoryError::NotFound,
            other => other,
        })?;

        TaggedItem::try_from(row)
    }

    /// Remove a tag attachment from an object.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such attachment exists on the object.
    pub async fn detach(
        &self,
        content_type: ContentType,
        object_id: i64,
        id: TaggedItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM tags.tagged_item WHERE id = $1 AND content_type = $2 AND object_id = $3",
        )
        .bind(id)
        .bind(content_type.label())
        .bind(object_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
