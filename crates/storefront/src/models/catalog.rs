//! Catalog domain types: collections, products, promotions, reviews, images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use storefront_core::{
    CollectionId, ProductId, ProductImageId, PromotionId, ReviewId, UnitPrice,
};

/// A product collection with the number of products it holds.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    #[serde(skip)]
    pub featured_product: Option<ProductId>,
    pub products_count: i64,
}

/// A catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// Current unit price. Order items copy this at purchase time.
    pub price: UnitPrice,
    pub inventory: i32,
    pub last_update: DateTime<Utc>,
    pub collection_id: CollectionId,
}

impl Product {
    /// Price including tax, rounded to cents.
    #[must_use]
    pub fn price_with_tax(&self) -> Decimal {
        self.price.with_tax()
    }
}

/// The `{id, title, price}` projection embedded in cart and order items.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub price: UnitPrice,
}

/// A discount that can be attached to many products.
#[derive(Debug, Clone, Serialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub description: String,
    pub discount: f64,
}

/// A customer review of a product.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub date: DateTime<Utc>,
    pub name: String,
    pub description: String,
    pub product: ProductId,
}

/// An uploaded product image. `path` is relative to the media root.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub path: String,
}
