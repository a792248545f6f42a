//! Promotion repository, including the product/promotion link table.

use sqlx::PgPool;

use storefront_core::{ContentType, ProductId, PromotionId};

use super::{RepositoryError, forget_objects};
use crate::models::Promotion;

#[derive(sqlx::FromRow)]
struct PromotionRow {
    id: i64,
    description: String,
    discount: f64,
}

impl From<PromotionRow> for Promotion {
    fn from(r: PromotionRow) -> Self {
        Self {
            id: PromotionId::new(r.id),
            description: r.description,
            discount: r.discount,
        }
    }
}

/// Repository for promotions.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All promotions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Promotion>, RepositoryError> {
        let rows = sqlx::query_as::<_, PromotionRow>(
            "SELECT id, description, discount FROM store.promotion ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Promotion::from).collect())
    }

    /// Get a promotion by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let row = sqlx::query_as::<_, PromotionRow>(
            "SELECT id, description, discount FROM store.promotion WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Promotion::from))
    }

    /// Find a promotion by exact description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_description(
        &self,
        description: &str,
    ) -> Result<Option<Promotion>, RepositoryError> {
        let row = sqlx::query_as::<_, PromotionRow>(
            "SELECT id, description, discount FROM store.promotion WHERE description = $1 ORDER BY id LIMIT 1",
        )
        .bind(description)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Promotion::from))
    }

    /// Create a promotion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        description: &str,
        discount: f64,
    ) -> Result<Promotion, RepositoryError> {
        let row = sqlx::query_as::<_, PromotionRow>(
            r"
            INSERT INTO store.promotion (description, discount)
            VALUES ($1, $2)
            RETURNING id, description, discount
            ",
        )
        .bind(description)
        .bind(discount)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a promotion. Product links are removed by cascade; tags and
    /// likes on it are removed here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the promotion does not exist.
    pub async fn delete(&self, id: PromotionId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM store.promotion WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        forget_objects(&mut tx, ContentType::Promotion, &[id.as_i64()]).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Promotions attached to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Promotion>, RepositoryError> {
        let rows = sqlx::query_as::<_, PromotionRow>(
            r"
            SELECT p.id, p.description, p.discount
            FROM store.promotion p
            JOIN store.product_promotion pp ON pp.promotion_id = p.id
            WHERE pp.product_id = $1
            ORDER BY p.id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Promotion::from).collect())
    }

    /// Attach a promotion to a product. Attaching twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if either side does not exist.
    pub async fn attach(
        &self,
        product_id: ProductId,
        promotion_id: PromotionId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO store.product_promotion (product_id, promotion_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(product_id)
        .bind(promotion_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Promotion does not exist"))?;

        Ok(())
    }

    /// Detach a promotion from a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the link does not exist.
    pub async fn detach(
        &self,
        product_id: ProductId,
        promotion_id: PromotionId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM store.product_promotion WHERE product_id = $1 AND promotion_id = $2",
        )
        .bind(product_id)
        .bind(promotion_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
