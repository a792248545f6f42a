//! Promotion route handlers, including the per-product promotion links.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use storefront_core::{ProductId, PromotionId};

use crate::db::{ProductRepository, PromotionRepository};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::Promotion;
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::{ValidationErrors, check_text};

const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Promotion create body.
#[derive(Debug, Deserialize)]
pub struct PromotionPayload {
    pub description: Option<String>,
    pub discount: Option<f64>,
}

/// Body for attaching a promotion to a product.
#[derive(Debug, Deserialize)]
pub struct AttachPayload {
    pub promotion_id: Option<PromotionId>,
}

fn check_payload(payload: PromotionPayload) -> std::result::Result<(String, f64), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let description = check_text(
        &mut errors,
        "description",
        payload.description,
        MAX_DESCRIPTION_LENGTH,
    );
    let discount = errors.require("discount", payload.discount).and_then(|d| {
        if d.is_finite() {
            Some(d)
        } else {
            errors.add("discount", "A valid number is required.");
            None
        }
    });

    errors.finish()?;
    match (description, discount) {
        (Some(description), Some(discount)) => Ok((description, discount)),
        _ => Err(ValidationErrors::new()),
    }
}

async fn ensure_product(state: &AppState, id: ProductId) -> Result<()> {
    if ProductRepository::new(state.pool()).exists(id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(NOT_FOUND.to_owned()))
    }
}

/// `GET /store/promotions`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Promotion>>> {
    Ok(Json(PromotionRepository::new(state.pool()).list().await?))
}

/// `POST /store/promotions`
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    JsonBody(payload): JsonBody<PromotionPayload>,
) -> Result<impl IntoResponse> {
    let (description, discount) = check_payload(payload)?;
    let promotion = PromotionRepository::new(state.pool())
        .create(&description, discount)
        .await?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

/// `GET /store/promotions/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams(id): PathParams<PromotionId>,
) -> Result<Json<Promotion>> {
    PromotionRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `DELETE /store/promotions/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<PromotionId>,
) -> Result<StatusCode> {
    PromotionRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /store/products/{product_pk}/promotions`
#[instrument(skip(state))]
pub async fn product_index(
    State(state): State<AppState>,
    PathParams(product_id): PathParams<ProductId>,
) -> Result<Json<Vec<Promotion>>> {
    ensure_product(&state, product_id).await?;
    let promotions = PromotionRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;
    Ok(Json(promotions))
}

/// `POST /store/products/{product_pk}/promotions`
#[instrument(skip(state))]
pub async fn attach(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(product_id): PathParams<ProductId>,
    JsonBody(payload): JsonBody<AttachPayload>,
) -> Result<impl IntoResponse> {
    ensure_product(&state, product_id).await?;

    let promotion_id = payload
        .promotion_id
        .ok_or_else(|| ValidationErrors::single("promotion_id", crate::validation::REQUIRED))?;

    let repo = PromotionRepository::new(state.pool());
    let promotion = repo
        .get(promotion_id)
        .await?
        .ok_or_else(|| ValidationErrors::single("promotion_id", "Promotion does not exist"))?;

    repo.attach(product_id, promotion_id).await?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

/// `DELETE /store/products/{product_pk}/promotions/{promotion_id}`
#[instrument(skip(state))]
pub async fn detach(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((product_id, promotion_id)): PathParams<(ProductId, PromotionId)>,
) -> Result<StatusCode> {
    PromotionRepository::new(state.pool())
        .detach(product_id, promotion_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_payload() {
        let (description, discount) = check_payload(PromotionPayload {
            description: Some(" Summer sale ".to_owned()),
            discount: Some(0.15),
        })
        .unwrap();
        assert_eq!(description, "Summer sale");
        assert!((discount - 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn test_check_payload_requires_fields() {
        let errors = check_payload(PromotionPayload {
            description: None,
            discount: None,
        })
        .unwrap_err();
        assert!(errors.get("description").is_some());
        assert!(errors.get("discount").is_some());
    }
}
