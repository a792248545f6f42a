//! Cart route handlers.
//!
//! Carts are anonymous: whoever holds the UUID can read and change it.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storefront_core::{CartId, CartItemId, ProductId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::models::{Cart, CartItem, CartLine, ProductSummary};
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::ValidationErrors;

/// A cart line with its computed total.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product: ProductSummary,
    pub quantity: i16,
    pub total_price: Decimal,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            total_price: item.total_price(),
            id: item.id,
            product: item.product,
            quantity: item.quantity,
        }
    }
}

/// A cart with its lines and grand total.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: CartId,
    pub items: Vec<CartItemResponse>,
    pub total_price: Decimal,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            total_price: cart.total_price(),
            id: cart.id,
            items: cart.items.into_iter().map(CartItemResponse::from).collect(),
        }
    }
}

/// Body for adding a product to a cart.
#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

/// Body for changing a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateItemPayload {
    pub quantity: Option<i64>,
}

/// Quantities are `SMALLINT` and at least one.
fn check_quantity(errors: &mut ValidationErrors, quantity: Option<i64>) -> Option<i16> {
    let quantity = errors.require("quantity", quantity)?;
    if quantity < 1 {
        errors.add("quantity", "Ensure this value is greater than or equal to 1.");
        return None;
    }
    errors.check(
        "quantity",
        i16::try_from(quantity).map_err(|_| "Ensure this value is less than or equal to 32767."),
    )
}

async fn ensure_cart(state: &AppState, cart_id: CartId) -> Result<()> {
    if CartRepository::new(state.pool()).exists(cart_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(NOT_FOUND.to_owned()))
    }
}

/// `POST /store/carts`
#[instrument(skip(state))]
pub async fn create(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let cart = CartRepository::new(state.pool()).create().await?;

    tracing::debug!(cart_id = %cart.id, "Cart created");
    Ok((StatusCode::CREATED, Json(CartResponse::from(cart))))
}

/// `GET /store/carts/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams(id): PathParams<CartId>,
) -> Result<Json<CartResponse>> {
    CartRepository::new(state.pool())
        .get(id)
        .await?
        .map(|cart| Json(cart.into()))
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `DELETE /store/carts/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    PathParams(id): PathParams<CartId>,
) -> Result<StatusCode> {
    CartRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /store/carts/{cart_pk}/items`
#[instrument(skip(state))]
pub async fn items(
    State(state): State<AppState>,
    PathParams(cart_id): PathParams<CartId>,
) -> Result<Json<Vec<CartItemResponse>>> {
    ensure_cart(&state, cart_id).await?;

    let items = CartRepository::new(state.pool()).list_items(cart_id).await?;
    Ok(Json(items.into_iter().map(CartItemResponse::from).collect()))
}

/// `POST /store/carts/{cart_pk}/items`
///
/// Adding a product already in the cart increases its quantity.
#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    PathParams(cart_id): PathParams<CartId>,
    JsonBody(payload): JsonBody<AddItemPayload>,
) -> Result<impl IntoResponse> {
    ensure_cart(&state, cart_id).await?;

    let mut errors = ValidationErrors::new();
    let product_id = errors.require("product_id", payload.product_id);
    let quantity = check_quantity(&mut errors, payload.quantity);

    if let Some(product_id) = product_id {
        if !ProductRepository::new(state.pool()).exists(product_id).await? {
            errors.add("product_id", "Product does not exist");
        }
    }
    errors.finish()?;
    let (Some(product_id), Some(quantity)) = (product_id, quantity) else {
        return Err(ValidationErrors::new().into());
    };

    let line: CartLine = CartRepository::new(state.pool())
        .add_item(cart_id, product_id, quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::OutOfRange(_) => AppError::Validation(ValidationErrors::single(
                "quantity",
                "Ensure this value is less than or equal to 32767.",
            )),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(line)))
}

/// `GET /store/carts/{cart_pk}/items/{id}`
#[instrument(skip(state))]
pub async fn show_item(
    State(state): State<AppState>,
    PathParams((cart_id, id)): PathParams<(CartId, CartItemId)>,
) -> Result<Json<CartItemResponse>> {
    CartRepository::new(state.pool())
        .get_item(cart_id, id)
        .await?
        .map(|item| Json(item.into()))
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `PATCH /store/carts/{cart_pk}/items/{id}`
#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    PathParams((cart_id, id)): PathParams<(CartId, CartItemId)>,
    JsonBody(payload): JsonBody<UpdateItemPayload>,
) -> Result<Json<CartLine>> {
    let repo = CartRepository::new(state.pool());
    if repo.get_item(cart_id, id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let mut errors = ValidationErrors::new();
    let quantity = check_quantity(&mut errors, payload.quantity);
    errors.finish()?;
    let quantity = quantity.ok_or_else(ValidationErrors::new)?;

    Ok(Json(repo.update_quantity(cart_id, id, quantity).await?))
}

/// `DELETE /store/carts/{cart_pk}/items/{id}`
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    PathParams((cart_id, id)): PathParams<(CartId, CartItemId)>,
) -> Result<StatusCode> {
    CartRepository::new(state.pool())
        .remove_item(cart_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_quantity_bounds() {
        let mut errors = ValidationErrors::new();
        assert_eq!(check_quantity(&mut errors, Some(1)), Some(1));
        assert_eq!(check_quantity(&mut errors, Some(32_767)), Some(32_767));
        assert!(errors.is_empty());

        assert_eq!(check_quantity(&mut errors, Some(0)), None);
        assert_eq!(
            errors.get("quantity").unwrap(),
            ["Ensure this value is greater than or equal to 1."]
        );

        let mut errors = ValidationErrors::new();
        assert_eq!(check_quantity(&mut errors, Some(32_768)), None);
        assert_eq!(
            errors.get("quantity").unwrap(),
            ["Ensure this value is less than or equal to 32767."]
        );
    }

    #[test]
    fn test_check_quantity_required() {
        let mut errors = ValidationErrors::new();
        assert_eq!(check_quantity(&mut errors, None), None);
        assert_eq!(errors.get("quantity").unwrap(), ["This field is required."]);
    }
}
