//! Storefront Core - Shared domain types.
//!
//! This crate provides the types used across all Storefront components:
//! - `storefront` - JSON API server (catalog, carts, orders, customers)
//! - `cli` - Command-line tools for migrations, users and seed data
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Enabling the `postgres` feature adds `sqlx` encoding for
//! the newtypes so repositories can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, usernames, prices, statuses and
//!   generic-relation content types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
