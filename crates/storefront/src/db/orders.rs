//! Order repository.
//!
//! [`OrderRepository::place_from_cart`] is the only multi-statement write in
//! the storefront. It runs in one transaction:
//!
//! 1. lock the cart row (`FOR UPDATE`) so two checkouts of the same cart
//!    serialize; the loser finds the cart gone,
//! 2. resolve the caller's customer profile,
//! 3. insert the order and copy every cart line into order items at the
//!    product's current price,
//! 4. delete the cart (its lines cascade).
//!
//! An empty cart is detected after the copy: zero inserted rows rolls the
//! whole transaction back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use storefront_core::{
    CartId, CustomerId, OrderId, OrderItemId, PaymentStatus, ProductId, UnitPrice, UserId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem, ProductSummary};

/// Message returned when an order still has items.
pub const ORDER_PROTECTED: &str = "An order cannot be deleted because it has order items";

/// Which orders a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order (staff).
    All,
    /// Only orders of the customer owned by this user.
    Owner(UserId),
}

/// Result of trying to turn a cart into an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed(OrderId),
    CartMissing,
    CartEmpty,
    NoCustomer,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    placed_at: DateTime<Utc>,
    payment_status: String,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    quantity: i16,
    unit_price: Decimal,
    product_id: i64,
    title: String,
    price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(r.id),
            product: ProductSummary {
                id: ProductId::new(r.product_id),
                title: r.title,
                price: UnitPrice::from_stored(r.price),
            },
            quantity: r.quantity,
            unit_price: UnitPrice::from_stored(r.unit_price),
        }
    }
}

fn build_order(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
    let payment_status = row.payment_status.trim().parse::<PaymentStatus>().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
    })?;

    Ok(Order {
        id: OrderId::new(row.id),
        customer: CustomerId::new(row.customer_id),
        placed_at: row.placed_at,
        payment_status,
        items,
    })
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.customer_id, o.placed_at, o.payment_status
    FROM store."order" o
    JOIN store.customer c ON c.id = o.customer_id
"#;

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders visible in `scope`, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, scope: OrderScope) -> Result<Vec<Order>, RepositoryError> {
        let rows = match scope {
            OrderScope::All => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{ORDER_SELECT} ORDER BY o.placed_at DESC, o.id DESC"
                ))
                .fetch_all(self.pool)
                .await?
            }
            OrderScope::Owner(user_id) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{ORDER_SELECT} WHERE c.user_id = $1 ORDER BY o.placed_at DESC, o.id DESC"
                ))
                .bind(user_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                build_order(row, order_items)
            })
            .collect()
    }

    /// Get an order by ID regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.get_scoped(id, OrderScope::All).await
    }

    /// Get an order by ID if it is visible in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_scoped(
        &self,
        id: OrderId,
        scope: OrderScope,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = match scope {
            OrderScope::All => {
                sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
                    .bind(id)
                    .fetch_optional(self.pool)
                    .await?
            }
            OrderScope::Owner(user_id) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{ORDER_SELECT} WHERE o.id = $1 AND c.user_id = $2"
                ))
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self
            .items_for(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        build_order(row, items).map(Some)
    }

    async fn items_for(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.quantity, oi.unit_price,
                   p.id AS product_id, p.title, p.price
            FROM store.order_item oi
            JOIN store.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    /// Convert a cart into an order for the customer owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails; the
    /// transaction is rolled back.
    pub async fn place_from_cart(
        &self,
        user_id: UserId,
        cart_id: CartId,
    ) -> Result<PlaceOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cart: Option<CartId> =
            sqlx::query_scalar("SELECT id FROM store.cart WHERE id = $1 FOR UPDATE")
                .bind(cart_id)
                .fetch_optional(&mut *tx)
                .await?;
        if cart.is_none() {
            return Ok(PlaceOutcome::CartMissing);
        }

        let customer_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM store.customer WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(customer_id) = customer_id else {
            return Ok(PlaceOutcome::NoCustomer);
        };

        let order_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO store."order" (customer_id, payment_status) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(customer_id)
        .bind(PaymentStatus::Pending.code())
        .fetch_one(&mut *tx)
        .await?;

        let copied = sqlx::query(
            r"
            INSERT INTO store.order_item (order_id, product_id, quantity, unit_price)
            SELECT $1, ci.product_id, ci.quantity, p.price
            FROM store.cart_item ci
            JOIN store.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $2
            ORDER BY ci.id
            ",
        )
        .bind(order_id)
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
        if copied.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(PlaceOutcome::CartEmpty);
        }

        sqlx::query("DELETE FROM store.cart WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PlaceOutcome::Placed(OrderId::new(order_id)))
    }

    /// Set an order's payment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(r#"UPDATE store."order" SET payment_status = $2 WHERE id = $1"#)
            .bind(id)
            .bind(status.code())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an order that has no items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` while order items reference it.
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i64> =
            sqlx::query_scalar(r#"SELECT id FROM store."order" WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let has_items: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM store.order_item WHERE order_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_items {
            return Err(RepositoryError::Protected(ORDER_PROTECTED.to_owned()));
        }

        sqlx::query(r#"DELETE FROM store."order" WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_delete(e, ORDER_PROTECTED))?;

        tx.commit().await?;
        Ok(())
    }
}
