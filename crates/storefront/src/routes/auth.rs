//! Account and token route handlers.
//!
//! Registration and the `/me` profile live under `/auth/users`; token
//! issuance under `/auth/jwt`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use storefront_core::{Email, UserId, Username};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::routes::extract::JsonBody;
use crate::services::auth::{AuthService, ProfileUpdate, Registration, TokenPair};
use crate::state::AppState;
use crate::validation::ValidationErrors;

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Token creation request.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Refresh request.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Verify request.
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

#[derive(Serialize)]
struct AccessResponse {
    access: String,
}

/// `POST /auth/users`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut body): JsonBody<Registration>,
) -> Result<impl IntoResponse> {
    // Staff accounts are created from the CLI only.
    body.is_staff = false;

    let user = AuthService::new(state.pool(), state.jwt())
        .register(body)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// `GET /auth/users/me`
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool(), state.jwt())
        .get_user(current.id)
        .await?;

    Ok(Json(user.into()))
}

/// `PUT /auth/users/me`
#[instrument(skip(state, body))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool(), state.jwt())
        .update_profile(current.id, body)
        .await?;

    Ok(Json(user.into()))
}

/// `POST /auth/jwt/create`
#[instrument(skip_all)]
pub async fn create_token(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsRequest>,
) -> Result<Json<TokenPair>> {
    let mut errors = ValidationErrors::new();
    let username = errors.require("username", body.username);
    let password = errors.require("password", body.password);
    errors.finish()?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ValidationErrors::new().into());
    };

    let pair = AuthService::new(state.pool(), state.jwt())
        .login(&username, &password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Token request rejected"))?;

    Ok(Json(pair))
}

/// `POST /auth/jwt/refresh`
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse> {
    let refresh = body
        .refresh
        .ok_or_else(|| ValidationErrors::single("refresh", crate::validation::REQUIRED))?;

    let access = AuthService::new(state.pool(), state.jwt())
        .refresh(&refresh)
        .await?;

    Ok(Json(AccessResponse { access }))
}

/// `POST /auth/jwt/verify`
#[instrument(skip_all)]
pub async fn verify_token(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<VerifyRequest>,
) -> Result<Json<Value>> {
    let token = body
        .token
        .ok_or_else(|| ValidationErrors::single("token", crate::validation::REQUIRED))?;

    AuthService::new(state.pool(), state.jwt()).verify(&token)?;

    Ok(Json(json!({})))
}
