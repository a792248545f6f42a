//! Review repository. Every query is scoped to a product.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storefront_core::{ContentType, ProductId, ReviewId};

use super::{RepositoryError, forget_objects};
use crate::models::Review;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    product_id: i64,
    name: String,
    description: String,
    date: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(r.id),
            date: r.date,
            name: r.name,
            description: r.description,
            product: ProductId::new(r.product_id),
        }
    }
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, name, description, date
            FROM store.review
            WHERE product_id = $1
            ORDER BY date, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// A review, only if it belongs to `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        product_id: ProductId,
        id: ReviewId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, name, description, date
            FROM store.review
            WHERE product_id = $1 AND id = $2
            ",
        )
        .bind(product_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Review::from))
    }

    /// Create a review of `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn create(
        &self,
        product_id: ProductId,
        name: &str,
        description: &str,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO store.review (product_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, name, description, date
            ",
        )
        .bind(product_id)
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_write(e, "") {
            RepositoryError::InvalidReference(_) => RepositoryError::NotFound,
            other => other,
        })?;

        Ok(row.into())
    }

    /// Replace a review's name and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review is not on that product.
    pub async fn update(
        &self,
        product_id: ProductId,
        id: ReviewId,
        name: &str,
        description: &str,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            UPDATE store.review SET name = $3, description = $4
            WHERE product_id = $1 AND id = $2
            RETURNING id, product_id, name, description, date
            ",
        )
        .bind(product_id)
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(self.pool)
        .await?;

        row.map(Review::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a review along with the tags and likes pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review is not on that product.
    pub async fn delete(&self, product_id: ProductId, id: ReviewId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM store.review WHERE product_id = $1 AND id = $2")
            .bind(product_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        forget_objects(&mut tx, ContentType::Review, &[id.as_i64()]).await?;

        tx.commit().await?;
        Ok(())
    }
}
