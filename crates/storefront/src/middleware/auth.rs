//! Authentication extractors.
//!
//! Requests authenticate with an access token in the `Authorization` header,
//! using either the `JWT` or the `Bearer` scheme:
//!
//! ```text
//! Authorization: JWT eyJhbGciOiJIUzI1NiIs...
//! ```
//!
//! Handlers declare what they need by taking one of the extractors below.
//! Claims are trusted as issued; the staff flag is only re-read from the
//! database when a token is refreshed.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, TokenType};
use crate::state::AppState;

/// Accepted `Authorization` schemes.
const SCHEMES: [&str; 2] = ["JWT", "Bearer"];

/// 401 body when no credentials were sent.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// 403 body when the caller is not staff.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}!", user.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an authenticated staff user.
///
/// Anonymous callers get 401, authenticated non-staff callers 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff(pub CurrentUser);

/// Pull the token out of an `Authorization` header value.
///
/// Returns `Ok(None)` for a missing header or a scheme we don't handle.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header.".to_owned()))?;

    let mut words = value.split_whitespace();
    let Some(scheme) = words.next() else {
        return Ok(None);
    };
    if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Ok(None);
    }

    match (words.next(), words.next()) {
        (Some(token), None) => Ok(Some(token)),
        (None, _) => Err(AppError::Unauthorized(
            "Invalid Authorization header. No credentials provided.".to_owned(),
        )),
        (Some(_), Some(_)) => Err(AppError::Unauthorized(
            "Invalid Authorization header. Credentials string should not contain spaces."
                .to_owned(),
        )),
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let claims = state
        .jwt()
        .verify(token, TokenType::Access)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::Auth(AuthError::InvalidToken(e))
        })?;

    set_sentry_user(&claims.user_id);

    Ok(Some(CurrentUser {
        id: claims.user_id,
        is_staff: claims.is_staff,
    }))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authenticate(parts, &state)?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHENTICATED.to_owned()))
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden(PERMISSION_DENIED.to_owned()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_schemes() {
        assert_eq!(bearer_token(&parts(Some("JWT abc"))).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("jwt abc"))).unwrap(), Some("abc"));
    }

    #[test]
    fn test_bearer_token_ignores_other_schemes() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).unwrap(), None);
        assert_eq!(bearer_token(&parts(Some(""))).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_malformed() {
        assert!(bearer_token(&parts(Some("JWT"))).is_err());
        assert!(bearer_token(&parts(Some("JWT a b"))).is_err());
    }
}
