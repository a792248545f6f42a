//! Product image route handlers.
//!
//! Uploads are `multipart/form-data` with the file in the `image` field.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use storefront_core::{ProductId, ProductImageId};

use crate::db::{ProductImageRepository, ProductRepository};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::ProductImage;
use crate::routes::extract::PathParams;
use crate::services::media::{MediaError, MediaStore};
use crate::state::AppState;

/// Multipart field holding the file.
const IMAGE_FIELD: &str = "image";

/// An image as returned by the API; `image` is an absolute URL.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: ProductImageId,
    pub image: String,
}

impl ImageResponse {
    fn new(image: &ProductImage, media: &MediaStore) -> Self {
        Self {
            id: image.id,
            image: media.url(&image.path),
        }
    }
}

/// Read the `image` part, returning its file name and contents.
async fn read_image(mut multipart: Multipart) -> Result<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if file_name.is_empty() || bytes.is_empty() {
            return Err(MediaError::Missing.into());
        }
        return Ok((file_name, bytes.to_vec()));
    }

    Err(MediaError::Missing.into())
}

/// `GET /store/products/{product_pk}/images`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    PathParams(product_id): PathParams<ProductId>,
) -> Result<Json<Vec<ImageResponse>>> {
    if !ProductRepository::new(state.pool()).exists(product_id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let images = ProductImageRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;

    Ok(Json(
        images
            .iter()
            .map(|image| ImageResponse::new(image, state.media()))
            .collect(),
    ))
}

/// `POST /store/products/{product_pk}/images`
#[instrument(skip(state, multipart))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(product_id): PathParams<ProductId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    if !ProductRepository::new(state.pool()).exists(product_id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_owned()));
    }

    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (file_name, bytes) = read_image(multipart).await?;

    let path = state.media().save_product_image(&file_name, &bytes).await?;

    let image = match ProductImageRepository::new(state.pool())
        .create(product_id, &path)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            // Don't leave an orphaned file behind.
            if let Err(cleanup) = state.media().delete(&path).await {
                tracing::warn!(error = %cleanup, path = %path, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product_id, image_id = %image.id, "Product image uploaded");
    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::new(&image, state.media())),
    ))
}

/// `GET /store/products/{product_pk}/images/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams((product_id, id)): PathParams<(ProductId, ProductImageId)>,
) -> Result<Json<ImageResponse>> {
    let image = ProductImageRepository::new(state.pool())
        .get(product_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))?;

    Ok(Json(ImageResponse::new(&image, state.media())))
}

/// `DELETE /store/products/{product_pk}/images/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams((product_id, id)): PathParams<(ProductId, ProductImageId)>,
) -> Result<StatusCode> {
    let path = ProductImageRepository::new(state.pool())
        .delete(product_id, id)
        .await?;

    if let Err(e) = state.media().delete(&path).await {
        tracing::warn!(error = %e, path = %path, "Failed to remove product image file");
    }

    Ok(StatusCode::NO_CONTENT)
}
