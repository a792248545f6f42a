//! Collection repository.

use sqlx::PgPool;

use storefront_core::{CollectionId, ContentType, ProductId};

use super::{RepositoryError, forget_objects};
use crate::models::Collection;

/// Message returned when a collection still holds products.
pub const COLLECTION_PROTECTED: &str =
    "A collection cannot be deleted because it is associated with a product";

#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: i64,
    title: String,
    featured_product_id: Option<i64>,
    products_count: i64,
}

impl From<CollectionRow> for Collection {
    fn from(r: CollectionRow) -> Self {
        Self {
            id: CollectionId::new(r.id),
            title: r.title,
            featured_product: r.featured_product_id.map(ProductId::new),
            products_count: r.products_count,
        }
    }
}

const SELECT_WITH_COUNT: &str = r"
    SELECT c.id, c.title, c.featured_product_id,
           (SELECT COUNT(*) FROM store.product p WHERE p.collection_id = c.id) AS products_count
    FROM store.collection c
";

/// Repository for collections.
pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    /// Create a new collection repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All collections ordered by title, with product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, CollectionRow>(&format!(
            "{SELECT_WITH_COUNT} ORDER BY c.title, c.id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Collection::from).collect())
    }

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "{SELECT_WITH_COUNT} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Collection::from))
    }

    /// Whether a collection exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CollectionId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM store.collection WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Find a collection by exact title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_title(&self, title: &str) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "{SELECT_WITH_COUNT} WHERE c.title = $1 ORDER BY c.id LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Collection::from))
    }

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the featured product does not exist.
    pub async fn create(
        &self,
        title: &str,
        featured_product: Option<ProductId>,
    ) -> Result<Collection, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            INSERT INTO store.collection (title, featured_product_id)
            VALUES ($1, $2)
            RETURNING id, title, featured_product_id, 0::BIGINT AS products_count
            ",
        )
        .bind(title)
        .bind(featured_product)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Featured product does not exist"))?;

        Ok(row.into())
    }

    /// Replace a collection's title and featured product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection does not exist.
    pub async fn update(
        &self,
        id: CollectionId,
        title: &str,
        featured_product: Option<ProductId>,
    ) -> Result<Collection, RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.collection SET title = $2, featured_product_id = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(featured_product)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Featured product does not exist"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a collection that holds no products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` if products still reference it.
    /// Returns `RepositoryError::NotFound` if the collection does not exist.
    pub async fn delete(&self, id: CollectionId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM store.collection WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM store.product WHERE collection_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if products > 0 {
            return Err(RepositoryError::Protected(COLLECTION_PROTECTED.to_owned()));
        }

        forget_objects(&mut tx, ContentType::Collection, &[id.as_i64()]).await?;
        sqlx::query("DELETE FROM store.collection WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_delete(e, COLLECTION_PROTECTED))?;

        tx.commit().await?;
        Ok(())
    }
}
