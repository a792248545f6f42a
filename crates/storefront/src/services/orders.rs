//! Order placement.
//!
//! Placing an order converts a cart into an order in one transaction: the
//! cart row is locked, its items are copied into order items at the current
//! product price, and the cart is deleted. Either all of that happens or none.

use sqlx::PgPool;
use thiserror::Error;

use storefront_core::{CartId, UserId};

use crate::db::RepositoryError;
use crate::db::orders::{OrderRepository, PlaceOutcome};
use crate::models::Order;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No cart with the given ID.
    #[error("Cart does not exist")]
    CartNotFound,

    /// The cart has no items.
    #[error("Cart is empty")]
    CartEmpty,

    /// The requesting user has no customer profile.
    #[error("No customer profile exists for this user")]
    CustomerNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order placement service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Place an order for `user_id` from the contents of `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::CartNotFound` or `OrderError::CartEmpty` if the
    /// cart cannot be ordered, `OrderError::CustomerNotFound` if the user has
    /// no customer profile.
    pub async fn place_order(&self, user_id: UserId, cart_id: CartId) -> Result<Order, OrderError> {
        let order_id = match self.orders.place_from_cart(user_id, cart_id).await? {
            PlaceOutcome::Placed(order_id) => order_id,
            PlaceOutcome::CartMissing => return Err(OrderError::CartNotFound),
            PlaceOutcome::CartEmpty => return Err(OrderError::CartEmpty),
            PlaceOutcome::NoCustomer => return Err(OrderError::CustomerNotFound),
        };

        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer,
            user_id = %user_id,
            items = order.items.len(),
            "Order created"
        );

        Ok(order)
    }
}
