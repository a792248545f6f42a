//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON. Validation failures are a field map, permission
//! and lookup failures a `{"detail": ...}` object, and refused deletes an
//! `{"error": ...}` object.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::media::MediaError;
use crate::services::orders::OrderError;
use crate::validation::{NON_FIELD_ERRORS, ValidationErrors};

/// Body of every 404.
pub const NOT_FOUND: &str = "Not found.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Image upload or removal failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Request body failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::NotFound(NOT_FOUND.to_owned())
    }
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => matches!(
                err,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenIssue(_)
            ),
            Self::Media(err) => matches!(err, MediaError::Io(_)),
            Self::Order(err) => matches!(err, OrderError::Repository(_)),
            _ => false,
        }
    }

    fn status_and_body(&self) -> (StatusCode, Value) {
        let internal = || {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("Internal server error"),
            )
        };

        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => (StatusCode::NOT_FOUND, detail(NOT_FOUND)),
                RepositoryError::Protected(msg) => {
                    (StatusCode::METHOD_NOT_ALLOWED, json!({ "error": msg }))
                }
                RepositoryError::Conflict(_) => (
                    StatusCode::CONFLICT,
                    detail("The request conflicts with an existing record."),
                ),
                RepositoryError::InvalidReference(msg) => {
                    (StatusCode::BAD_REQUEST, field_error(NON_FIELD_ERRORS, msg))
                }
                RepositoryError::OutOfRange(_) => (
                    StatusCode::BAD_REQUEST,
                    field_error(NON_FIELD_ERRORS, "A value is out of range."),
                ),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
            },
            Self::Auth(err) => match err {
                AuthError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    detail("No active account found with the given credentials"),
                ),
                AuthError::UserNotFound => (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "User not found", "code": "user_not_found" }),
                ),
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" }),
                ),
                AuthError::UserAlreadyExists(field) => (
                    StatusCode::CONFLICT,
                    field_error(field, &format!("A user with that {field} already exists.")),
                ),
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenIssue(_) => {
                    internal()
                }
            },
            Self::Media(err) => match err {
                MediaError::Io(_) => internal(),
                other => (StatusCode::BAD_REQUEST, field_error("image", &other.to_string())),
            },
            Self::Order(err) => match err {
                OrderError::CartNotFound | OrderError::CartEmpty => {
                    (StatusCode::BAD_REQUEST, field_error("cart_id", &err.to_string()))
                }
                OrderError::CustomerNotFound => (
                    StatusCode::BAD_REQUEST,
                    field_error(NON_FIELD_ERRORS, &err.to_string()),
                ),
                OrderError::Repository(_) => internal(),
            },
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, detail(msg)),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, detail(msg)),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, detail(msg)),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, detail(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

fn detail(message: &str) -> Value {
    json!({ "detail": message })
}

fn field_error(field: &str, message: &str) -> Value {
    json!({ field: [message] })
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::services::auth::JwtError;

    async fn status_and_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption(
                "test".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidToken(JwtError::Expired))),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_protected_delete_body() {
        let (status, body) = status_and_json(AppError::Database(RepositoryError::Protected(
            "A product cannot be deleted because it is associated with an order item".to_owned(),
        )))
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body,
            json!({"error": "A product cannot be deleted because it is associated with an order item"})
        );
    }

    #[tokio::test]
    async fn test_missing_reference_is_bad_request() {
        let (status, body) = status_and_json(AppError::Database(
            RepositoryError::InvalidReference("Featured product does not exist".to_owned()),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"non_field_errors": ["Featured product does not exist"]})
        );
    }

    #[tokio::test]
    async fn test_validation_body() {
        let errors = ValidationErrors::single("product_id", "Product does not exist");
        let (status, body) = status_and_json(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"product_id": ["Product does not exist"]}));
    }

    #[tokio::test]
    async fn test_order_errors_are_field_errors() {
        let (status, body) = status_and_json(OrderError::CartEmpty.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"cart_id": ["Cart is empty"]}));
    }

    #[tokio::test]
    async fn test_internal_details_not_leaked() {
        let (status, body) = status_and_json(AppError::Database(
            RepositoryError::DataCorruption("secret table detail".to_owned()),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_duplicate_user_is_conflict() {
        let (status, body) =
            status_and_json(AuthError::UserAlreadyExists("username").into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({"username": ["A user with that username already exists."]})
        );
    }

    #[tokio::test]
    async fn test_non_image_upload_is_field_error() {
        let (status, body) = status_and_json(MediaError::NotAnImage.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"image": ["Upload a valid image. The file you uploaded was either not an image or a corrupted image."]})
        );
    }
}
