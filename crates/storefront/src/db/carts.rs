//! Cart repository.
//!
//! Adding a product that is already in the cart merges quantities with a
//! single `INSERT ... ON CONFLICT DO UPDATE`, so concurrent adds of the same
//! product never create a second line or lose an increment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use storefront_core::{CartId, CartItemId, ProductId, UnitPrice};

use super::RepositoryError;
use crate::models::{Cart, CartItem, CartLine, ProductSummary};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    quantity: i16,
    product_id: i64,
    title: String,
    price: Decimal,
}

impl From<CartItemRow> for CartItem {
    fn from(r: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(r.id),
            product: ProductSummary {
                id: ProductId::new(r.product_id),
                title: r.title,
                price: UnitPrice::from_stored(r.price),
            },
            quantity: r.quantity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    product_id: i64,
    quantity: i16,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        Self {
            id: CartItemId::new(r.id),
            product_id: ProductId::new(r.product_id),
            quantity: r.quantity,
        }
    }
}

const ITEM_SELECT: &str = r"
    SELECT ci.id, ci.quantity, p.id AS product_id, p.title, p.price
    FROM store.cart_item ci
    JOIN store.product p ON p.id = ci.product_id
";

/// Repository for carts and their items.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an empty cart with a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "INSERT INTO store.cart (id) VALUES ($1) RETURNING id, created_at",
        )
        .bind(CartId::generate())
        .fetch_one(self.pool)
        .await?;

        Ok(Cart {
            id: row.id,
            created_at: row.created_at,
            items: Vec::new(),
        })
    }

    /// A cart with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let Some(row) =
            sqlx::query_as::<_, CartRow>("SELECT id, created_at FROM store.cart WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?
        else {
            return Ok(None);
        };

        let items = self.list_items(id).await?;

        Ok(Some(Cart {
            id: row.id,
            created_at: row.created_at,
            items,
        }))
    }

    /// Whether a cart exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CartId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM store.cart WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Delete a cart and its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    pub async fn delete(&self, id: CartId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.cart WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Items of a cart in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "{ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    /// One item, only if it belongs to `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "{ITEM_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2"
        ))
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(CartItem::from))
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart or product vanished.
    /// Returns `RepositoryError::OutOfRange` if the merged quantity overflows.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i16,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO store.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = store.cart_item.quantity + EXCLUDED.quantity
            RETURNING id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match RepositoryError::from_write(e, "") {
            RepositoryError::InvalidReference(_) => RepositoryError::NotFound,
            other => other,
        })?;

        Ok(row.into())
    }

    /// Set an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item is not in that cart.
    pub async fn update_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i16,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            UPDATE store.cart_item SET quantity = $3
            WHERE cart_id = $1 AND id = $2
            RETURNING id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;

        row.map(CartLine::from).ok_or(RepositoryError::NotFound)
    }

    /// Remove an item from a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item is not in that cart.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.cart_item WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
