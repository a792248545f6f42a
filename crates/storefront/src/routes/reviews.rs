//! Product review route handlers.
//!
//! Reviews are always addressed through their product. A review id under the
//! wrong product is a 404.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use storefront_core::{ProductId, ReviewId};

use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::Review;
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::{ValidationErrors, check_text};

const MAX_NAME_LENGTH: usize = 255;
const MAX_DESCRIPTION_LENGTH: usize = 10_000;

/// Review create/replace body.
#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn check_payload(payload: ReviewPayload) -> std::result::Result<(String, String), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = check_text(&mut errors, "name", payload.name, MAX_NAME_LENGTH);
    let description = check_text(
        &mut errors,
        "description",
        payload.description,
        MAX_DESCRIPTION_LENGTH,
    );

    errors.finish()?;
    name.zip(description).ok_or_else(ValidationErrors::new)
}

/// `GET /store/products/{product_pk}/reviews`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    PathParams(product_id): PathParams<ProductId>,
) -> Result<Json<Vec<Review>>> {
    if !ProductRepository::new(state.pool()).exists(product_id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;
    Ok(Json(reviews))
}

/// `POST /store/products/{product_pk}/reviews`
///
/// Anyone may leave a review.
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    PathParams(product_id): PathParams<ProductId>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<impl IntoResponse> {
    let (name, description) = check_payload(payload)?;

    let review = ReviewRepository::new(state.pool())
        .create(product_id, &name, &description)
        .await?;

    tracing::info!(product_id = %product_id, review_id = %review.id, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /store/products/{product_pk}/reviews/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams((product_id, id)): PathParams<(ProductId, ReviewId)>,
) -> Result<Json<Review>> {
    ReviewRepository::new(state.pool())
        .get(product_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `PUT /store/products/{product_pk}/reviews/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((product_id, id)): PathParams<(ProductId, ReviewId)>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<Json<Review>> {
    let repo = ReviewRepository::new(state.pool());
    if repo.get(product_id, id).await?.is_none() {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let (name, description) = check_payload(payload)?;
    let review = repo.update(product_id, id, &name, &description).await?;
    Ok(Json(review))
}

/// `DELETE /store/products/{product_pk}/reviews/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((product_id, id)): PathParams<(ProductId, ReviewId)>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool())
        .delete(product_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_payload() {
        let (name, description) = check_payload(ReviewPayload {
            name: Some("Ada".to_owned()),
            description: Some("Sturdy mug.".to_owned()),
        })
        .unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(description, "Sturdy mug.");
    }

    #[test]
    fn test_blank_description_rejected() {
        let errors = check_payload(ReviewPayload {
            name: Some("Ada".to_owned()),
            description: Some("   ".to_owned()),
        })
        .unwrap_err();
        assert_eq!(
            errors.get("description").unwrap(),
            ["This field may not be blank."]
        );
    }
}
