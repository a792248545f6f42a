//! Storefront library.
//!
//! A JSON API for a small online store: catalog, anonymous carts, customer
//! profiles, orders, tags and likes, with JWT authentication. The binary in
//! `main.rs` is a thin wrapper around [`app`]; integration tests drive the
//! same service in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use state::AppState;

/// The complete service: router, state and middleware, with trailing
/// slashes trimmed before routing so `/store/products/` and
/// `/store/products` are the same route.
pub fn app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(routes::router(state))
}
