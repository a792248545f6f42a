//! Collection route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use storefront_core::{CollectionId, ProductId};

use crate::db::{CollectionRepository, ProductRepository};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::Collection;
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::{ValidationErrors, check_text};

const MAX_TITLE_LENGTH: usize = 255;

/// Collection create/replace body.
#[derive(Debug, Deserialize)]
pub struct CollectionPayload {
    pub title: Option<String>,
    pub featured_product: Option<ProductId>,
}

/// Validate a payload, checking that the featured product exists.
async fn validate(
    state: &AppState,
    payload: CollectionPayload,
) -> Result<(String, Option<ProductId>)> {
    let mut errors = ValidationErrors::new();
    let title = check_text(&mut errors, "title", payload.title, MAX_TITLE_LENGTH);

    if let Some(product_id) = payload.featured_product {
        if !ProductRepository::new(state.pool()).exists(product_id).await? {
            errors.add(
                "featured_product",
                format!("Invalid pk \"{product_id}\" - object does not exist."),
            );
        }
    }

    errors.finish()?;
    let title = title.ok_or_else(ValidationErrors::new)?;
    Ok((title, payload.featured_product))
}

/// `GET /store/collections`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Collection>>> {
    let collections = CollectionRepository::new(state.pool()).list().await?;
    Ok(Json(collections))
}

/// `POST /store/collections`
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    JsonBody(payload): JsonBody<CollectionPayload>,
) -> Result<impl IntoResponse> {
    let (title, featured) = validate(&state, payload).await?;
    let collection = CollectionRepository::new(state.pool())
        .create(&title, featured)
        .await?;

    tracing::info!(collection_id = %collection.id, "Collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

/// `GET /store/collections/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams(id): PathParams<CollectionId>,
) -> Result<Json<Collection>> {
    CollectionRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `PUT /store/collections/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<CollectionId>,
    JsonBody(payload): JsonBody<CollectionPayload>,
) -> Result<Json<Collection>> {
    let repo = CollectionRepository::new(state.pool());
    if !repo.exists(id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let (title, featured) = validate(&state, payload).await?;
    let collection = repo.update(id, &title, featured).await?;
    Ok(Json(collection))
}

/// `DELETE /store/collections/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<CollectionId>,
) -> Result<StatusCode> {
    CollectionRepository::new(state.pool()).delete(id).await?;

    tracing::info!(collection_id = %id, "Collection deleted");
    Ok(StatusCode::NO_CONTENT)
}
