//! Tag route handlers.
//!
//! Tags attach to any object through `/{content_type}/{object_id}` where the
//! content type is an `<app>.<model>` label such as `store.product`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use storefront_core::{ContentType, TagId, TaggedItemId};

use crate::db::TagRepository;
use crate::db::tags::object_exists;
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::{Tag, TaggedItem};
use crate::routes::extract::{JsonBody, PathParams};
use crate::state::AppState;
use crate::validation::{REQUIRED, ValidationErrors, check_text};

const MAX_LABEL_LENGTH: usize = 255;

/// Tag create body.
#[derive(Debug, Deserialize)]
pub struct TagPayload {
    pub label: Option<String>,
}

/// Body for tagging an object.
#[derive(Debug, Deserialize)]
pub struct AttachPayload {
    pub tag_id: Option<TagId>,
}

/// Resolve a generic-relation target, 404 if the type is unknown or the
/// object does not exist.
pub(crate) async fn resolve_target(
    state: &AppState,
    content_type: &str,
    object_id: i64,
) -> Result<ContentType> {
    let content_type = content_type
        .parse::<ContentType>()
        .map_err(|_| AppError::NotFound(NOT_FOUND.to_owned()))?;

    if !object_exists(state.pool(), content_type, object_id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }
    Ok(content_type)
}

/// `GET /tags`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(TagRepository::new(state.pool()).list().await?))
}

/// `POST /tags`
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    JsonBody(payload): JsonBody<TagPayload>,
) -> Result<impl IntoResponse> {
    let mut errors = ValidationErrors::new();
    let label = check_text(&mut errors, "label", payload.label, MAX_LABEL_LENGTH);
    errors.finish()?;
    let label = label.ok_or_else(ValidationErrors::new)?;

    let tag = TagRepository::new(state.pool()).create(&label).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /tags/{content_type}/{object_id}`
#[instrument(skip(state))]
pub async fn for_object(
    State(state): State<AppState>,
    PathParams((content_type, object_id)): PathParams<(String, i64)>,
) -> Result<Json<Vec<TaggedItem>>> {
    let content_type = content_type
        .parse::<ContentType>()
        .map_err(|_| AppError::NotFound(NOT_FOUND.to_owned()))?;

    let items = TagRepository::new(state.pool())
        .get_by_model(content_type, object_id)
        .await?;
    Ok(Json(items))
}

/// `POST /tags/{content_type}/{object_id}`
#[instrument(skip(state))]
pub async fn attach(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((content_type, object_id)): PathParams<(String, i64)>,
    JsonBody(payload): JsonBody<AttachPayload>,
) -> Result<impl IntoResponse> {
    let content_type = resolve_target(&state, &content_type, object_id).await?;
    let tag_id = payload
        .tag_id
        .ok_or_else(|| ValidationErrors::single("tag_id", REQUIRED))?;

    let item = TagRepository::new(state.pool())
        .attach(tag_id, content_type, object_id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::Validation(ValidationErrors::single("tag_id", "Tag does not exist"))
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// `DELETE /tags/{content_type}/{object_id}/{id}`
#[instrument(skip(state))]
pub async fn detach(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((content_type, object_id, id)): PathParams<(String, i64, TaggedItemId)>,
) -> Result<StatusCode> {
    let content_type = content_type
        .parse::<ContentType>()
        .map_err(|_| AppError::NotFound(NOT_FOUND.to_owned()))?;

    TagRepository::new(state.pool())
        .detach(content_type, object_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
