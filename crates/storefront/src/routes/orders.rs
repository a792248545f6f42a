//! Order route handlers.
//!
//! Staff see and manage every order. Other users see only orders of their
//! own customer profile; anyone else's order is a 404.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use storefront_core::{CartId, OrderId, PaymentStatus};

use crate::db::OrderRepository;
use crate::db::orders::OrderScope;
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::{RequireAuth, RequireStaff};
use crate::models::{CurrentUser, Order};
use crate::routes::extract::{JsonBody, PathParams};
use crate::services::orders::OrderService;
use crate::state::AppState;
use crate::validation::{REQUIRED, ValidationErrors};

/// Order placement body.
#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub cart_id: Option<String>,
}

/// Payment status update body.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderPayload {
    pub payment_status: Option<String>,
}

const fn scope_for(user: CurrentUser) -> OrderScope {
    if user.is_staff {
        OrderScope::All
    } else {
        OrderScope::Owner(user.id)
    }
}

fn parse_cart_id(raw: Option<String>) -> std::result::Result<CartId, ValidationErrors> {
    let raw = raw.ok_or_else(|| ValidationErrors::single("cart_id", REQUIRED))?;
    Uuid::parse_str(raw.trim())
        .map(CartId::from_uuid)
        .map_err(|_| ValidationErrors::single("cart_id", "Must be a valid UUID."))
}

/// `GET /store/orders`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list(scope_for(current))
        .await?;
    Ok(Json(orders))
}

/// `POST /store/orders`
///
/// Turns the cart into an order for the caller's customer profile and
/// deletes the cart.
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(payload): JsonBody<CreateOrderPayload>,
) -> Result<Json<Order>> {
    let cart_id = parse_cart_id(payload.cart_id)?;

    let order = OrderService::new(state.pool())
        .place_order(current.id, cart_id)
        .await?;

    Ok(Json(order))
}

/// `GET /store/orders/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    PathParams(id): PathParams<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_scoped(id, scope_for(current))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `PATCH /store/orders/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<OrderId>,
    JsonBody(payload): JsonBody<UpdateOrderPayload>,
) -> Result<Json<Order>> {
    let repo = OrderRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let mut errors = ValidationErrors::new();
    let status = errors
        .require("payment_status", payload.payment_status)
        .and_then(|s| errors.check("payment_status", s.trim().parse::<PaymentStatus>()));
    errors.finish()?;
    let status = status.ok_or_else(ValidationErrors::new)?;

    let order = repo.update_status(id, status).await?;
    tracing::info!(order_id = %id, payment_status = %status, "Order status updated");
    Ok(Json(order))
}

/// `DELETE /store/orders/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<OrderId>,
) -> Result<StatusCode> {
    OrderRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_core::UserId;

    use super::*;

    #[test]
    fn test_scope_for() {
        let staff = CurrentUser {
            id: UserId::new(1),
            is_staff: true,
        };
        assert_eq!(scope_for(staff), OrderScope::All);

        let customer = CurrentUser {
            id: UserId::new(2),
            is_staff: false,
        };
        assert_eq!(scope_for(customer), OrderScope::Owner(UserId::new(2)));
    }

    #[test]
    fn test_parse_cart_id() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_cart_id(Some(id.to_string())).unwrap(),
            CartId::from_uuid(id)
        );
        assert_eq!(
            parse_cart_id(None).unwrap_err().get("cart_id").unwrap(),
            [REQUIRED]
        );
        assert_eq!(
            parse_cart_id(Some("nope".to_owned()))
                .unwrap_err()
                .get("cart_id")
                .unwrap(),
            ["Must be a valid UUID."]
        );
    }
}
