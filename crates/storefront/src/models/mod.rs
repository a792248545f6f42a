//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the `FromRow` row types
//! in [`crate::db`]. Types whose JSON shape matches the API response derive
//! `Serialize` directly; the rest are mapped in the route modules.

pub mod cart;
pub mod catalog;
pub mod customer;
pub mod order;
pub mod tag;
pub mod user;

pub use cart::{Cart, CartItem, CartLine};
pub use catalog::{Collection, Product, ProductImage, ProductSummary, Promotion, Review};
pub use customer::{Address, Customer};
pub use order::{Order, OrderItem};
pub use tag::{LikedItem, Tag, TaggedItem};
pub use user::{CurrentUser, User};
