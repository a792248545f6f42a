//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_core::{CustomerId, OrderId, OrderItemId, PaymentStatus, UnitPrice};

use super::catalog::ProductSummary;

/// A placed order. Items are fixed at placement time.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItem>,
}

/// A line of an order.
///
/// `unit_price` is the product price when the order was placed, not the live
/// price shown in `product`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: ProductSummary,
    pub quantity: i16,
    pub unit_price: UnitPrice,
}
