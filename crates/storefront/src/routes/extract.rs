//! Request extractors whose rejections render as [`AppError`] JSON bodies.
//!
//! Axum's stock `Json`, `Path` and `Query` reject with plain-text bodies.
//! These wrappers route the rejection through `AppError` so every error a
//! client sees has the same shape. A malformed path parameter (`/products/abc`)
//! is a 404, not a 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Typed path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

/// Typed query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
