//! Product image repository. Stores media-relative paths only.

use sqlx::PgPool;

use storefront_core::{ProductId, ProductImageId};

use super::RepositoryError;
use crate::models::ProductImage;

#[derive(sqlx::FromRow)]
struct ProductImageRow {
    id: i64,
    product_id: i64,
    image: String,
}

impl From<ProductImageRow> for ProductImage {
    fn from(r: ProductImageRow) -> Self {
        Self {
            id: ProductImageId::new(r.id),
            product_id: ProductId::new(r.product_id),
            path: r.image,
        }
    }
}

/// Repository for product images.
pub struct ProductImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductImageRepository<'a> {
    /// Create a new product image repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Images of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT id, product_id, image FROM store.product_image WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    /// An image, only if it belongs to `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        product_id: ProductId,
        id: ProductImageId,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductImageRow>(
            "SELECT id, product_id, image FROM store.product_image WHERE product_id = $1 AND id = $2",
        )
        .bind(product_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProductImage::from))
    }

    /// Record a stored image for a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn create(
        &self,
        product_id: ProductId,
        path: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ProductImageRow>(
            r"
            INSERT INTO store.product_image (product_id, image)
            VALUES ($1, $2)
            RETURNING id, product_id, image
            ",
        )
        .bind(product_id)
        .bind(path)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_write(e, "") {
            RepositoryError::InvalidReference(_) => RepositoryError::NotFound,
            other => other,
        })?;

        Ok(row.into())
    }

    /// Delete an image row, returning its stored path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image is not on that product.
    pub async fn delete(
        &self,
        product_id: ProductId,
        id: ProductImageId,
    ) -> Result<String, RepositoryError> {
        let path: Option<String> = sqlx::query_scalar(
            "DELETE FROM store.product_image WHERE product_id = $1 AND id = $2 RETURNING image",
        )
        .bind(product_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        path.ok_or(RepositoryError::NotFound)
    }
}
