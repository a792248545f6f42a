//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login and JWT issue/verify
//! - `media` - Product image validation, naming and storage
//! - `orders` - Turning a cart into an order

pub mod auth;
pub mod media;
pub mod orders;
