//! Shopping cart types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use storefront_core::{CartId, CartItemId, ProductId};

use super::catalog::ProductSummary;

/// An anonymous cart, identified by a UUID the client keeps.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Sum of every line total at current product prices.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::total_price).sum()
    }
}

/// One product line in a cart. A product appears at most once per cart.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: ProductSummary,
    pub quantity: i16,
}

impl CartItem {
    /// Quantity times the product's current price.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// A cart line as written: the shape returned after adding or updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i16,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use storefront_core::{CartId, CartItemId, ProductId, UnitPrice};

    use super::*;

    fn item(id: i64, price: Decimal, quantity: i16) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product: ProductSummary {
                id: ProductId::new(id),
                title: format!("Product {id}"),
                price: UnitPrice::parse(price).unwrap(),
            },
            quantity,
        }
    }

    #[test]
    fn test_empty_cart_total_is_zero() {
        let cart = Cart {
            id: CartId::generate(),
            created_at: Utc::now(),
            items: Vec::new(),
        };
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_cart_total_sums_lines() {
        let cart = Cart {
            id: CartId::generate(),
            created_at: Utc::now(),
            items: vec![
                item(1, Decimal::new(1050, 2), 2),
                item(2, Decimal::new(399, 2), 3),
            ],
        };
        assert_eq!(cart.items[0].total_price(), Decimal::new(2100, 2));
        assert_eq!(cart.total_price(), Decimal::new(3297, 2));
    }
}
