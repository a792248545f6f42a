//! Core types for Storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod content_type;
pub mod email;
pub mod id;
pub mod price;
pub mod status;
pub mod username;

pub use content_type::{ContentType, ContentTypeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{PriceError, UnitPrice, round_cents, tax_rate};
pub use status::*;
pub use username::{Username, UsernameError};
