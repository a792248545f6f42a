//! Like route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::db::LikeRepository;
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireAuth;
use crate::models::LikedItem;
use crate::routes::extract::PathParams;
use crate::routes::tags::resolve_target;
use crate::state::AppState;

/// `GET /likes/me`
#[instrument(skip(state))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<LikedItem>>> {
    let likes = LikeRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;
    Ok(Json(likes))
}

/// `POST /likes/{content_type}/{object_id}`
///
/// Liking something twice returns the existing like.
#[instrument(skip(state))]
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    PathParams((content_type, object_id)): PathParams<(String, i64)>,
) -> Result<impl IntoResponse> {
    let content_type = resolve_target(&state, &content_type, object_id).await?;

    let liked = LikeRepository::new(state.pool())
        .like(current.id, content_type, object_id)
        .await?;
    Ok((StatusCode::CREATED, Json(liked)))
}

/// `DELETE /likes/{content_type}/{object_id}`
#[instrument(skip(state))]
pub async fn unlike(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    PathParams((content_type, object_id)): PathParams<(String, i64)>,
) -> Result<StatusCode> {
    let content_type = content_type
        .parse()
        .map_err(|_| AppError::NotFound(NOT_FOUND.to_owned()))?;

    if LikeRepository::new(state.pool())
        .unlike(current.id, content_type, object_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(NOT_FOUND.to_owned()))
    }
}
