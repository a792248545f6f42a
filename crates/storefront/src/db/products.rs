//! Product repository.
//!
//! Listing supports the catalog filters (collection, case-insensitive title
//! substring) and a whitelist of orderings. Filters are pushed through
//! `QueryBuilder` with bound parameters; ordering fragments come only from
//! [`ProductOrdering`], never from client text.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use storefront_core::{CollectionId, ContentType, ProductId, UnitPrice};

use super::{RepositoryError, escape_like, forget_objects};
use crate::models::Product;

/// Message returned when order items still reference a product.
pub const PRODUCT_PROTECTED: &str =
    "A product cannot be deleted because it is associated with an order item";

/// A sort key accepted by the `ordering` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrdering {
    PriceAsc,
    PriceDesc,
    LastUpdateAsc,
    LastUpdateDesc,
}

impl ProductOrdering {
    /// Parse a comma-separated `ordering` value, skipping unknown fields.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        value
            .split(',')
            .filter_map(|term| match term.trim() {
                "price" => Some(Self::PriceAsc),
                "-price" => Some(Self::PriceDesc),
                "last_update" => Some(Self::LastUpdateAsc),
                "-last_update" => Some(Self::LastUpdateDesc),
                _ => None,
            })
            .collect()
    }

    const fn sql(self) -> &'static str {
        match self {
            Self::PriceAsc => "price ASC",
            Self::PriceDesc => "price DESC",
            Self::LastUpdateAsc => "last_update ASC",
            Self::LastUpdateDesc => "last_update DESC",
        }
    }
}

/// Catalog list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub collection_id: Option<CollectionId>,
    pub title_contains: Option<String>,
    /// Empty means the default order (title).
    pub ordering: Vec<ProductOrdering>,
}

/// Validated product fields for create and update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: UnitPrice,
    pub inventory: i32,
    pub collection_id: CollectionId,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    title: String,
    slug: String,
    description: Option<String>,
    price: Decimal,
    inventory: i32,
    last_update: DateTime<Utc>,
    collection_id: i64,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: ProductId::new(r.id),
            title: r.title,
            slug: r.slug,
            description: r.description,
            price: UnitPrice::from_stored(r.price),
            inventory: r.inventory,
            last_update: r.last_update,
            collection_id: CollectionId::new(r.collection_id),
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, title, slug, description, price, inventory, last_update, collection_id";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(collection_id) = filter.collection_id {
        qb.push(" AND collection_id = ").push_bind(collection_id);
    }
    if let Some(title) = filter.title_contains.as_deref().filter(|t| !t.is_empty()) {
        qb.push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }
}

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM store.product"));
        push_filters(&mut qb, filter);

        qb.push(" ORDER BY ");
        if filter.ordering.is_empty() {
            qb.push("title ASC");
        } else {
            let mut separated = qb.separated(", ");
            for ordering in &filter.ordering {
                separated.push(ordering.sql());
            }
        }
        qb.push(", id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Number of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM store.product");
        push_filters(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Whether a product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM store.product WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Find a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.product WHERE slug = $1 ORDER BY id LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the collection does not exist.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO store.product (title, slug, description, price, inventory, collection_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price.amount())
        .bind(input.inventory)
        .bind(input.collection_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Invalid collection"))?;

        Ok(row.into())
    }

    /// Replace a product's fields and touch `last_update`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE store.product
            SET title = $2, slug = $3, description = $4, price = $5, inventory = $6,
                collection_id = $7, last_update = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price.amount())
        .bind(input.inventory)
        .bind(input.collection_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Invalid collection"))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product that no order item references.
    ///
    /// Tags and likes pointing at the product are removed in the same
    /// transaction; images, reviews and cart lines cascade. Returns the media
    /// paths of the deleted images so the caller can remove the files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` if an order item references it.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM store.product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM store.order_item WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(RepositoryError::Protected(PRODUCT_PROTECTED.to_owned()));
        }

        let images: Vec<String> =
            sqlx::query_scalar("SELECT image FROM store.product_image WHERE product_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let reviews: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM store.review WHERE product_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        forget_objects(&mut tx, ContentType::Review, &reviews).await?;
        forget_objects(&mut tx, ContentType::Product, &[id.as_i64()]).await?;

        sqlx::query("DELETE FROM store.product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_delete(e, PRODUCT_PROTECTED))?;

        tx.commit().await?;
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordering() {
        assert_eq!(
            ProductOrdering::parse_list("-price"),
            vec![ProductOrdering::PriceDesc]
        );
        assert_eq!(
            ProductOrdering::parse_list("last_update, price"),
            vec![ProductOrdering::LastUpdateAsc, ProductOrdering::PriceAsc]
        );
    }

    #[test]
    fn test_parse_ordering_ignores_unknown_fields() {
        assert!(ProductOrdering::parse_list("inventory").is_empty());
        assert!(ProductOrdering::parse_list("price; DROP TABLE").is_empty());
        assert_eq!(
            ProductOrdering::parse_list("title,-last_update"),
            vec![ProductOrdering::LastUpdateDesc]
        );
    }

    #[test]
    fn test_filter_sql() {
        let filter = ProductFilter {
            collection_id: Some(CollectionId::new(3)),
            title_contains: Some("50%".to_owned()),
            ordering: Vec::new(),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM store.product");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM store.product WHERE TRUE AND collection_id = $1 AND title ILIKE $2"
        );
    }

    #[test]
    fn test_blank_title_filter_is_ignored() {
        let filter = ProductFilter {
            title_contains: Some(String::new()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_filters(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }
}
