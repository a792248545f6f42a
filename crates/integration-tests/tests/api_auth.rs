//! In-process tests for the authentication endpoints.
//!
//! Every request here is answered before the database is touched.

use axum::http::{Method, StatusCode};
use serde_json::json;

use storefront_integration_tests::{
    access_token, refresh_token, request, send, send_to, test_app,
};

#[tokio::test]
async fn test_register_requires_fields() {
    let resp = send(request(Method::POST, "/auth/users", Some(&json!({})), None)).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let body = resp.json();
    for field in ["username", "email", "password"] {
        assert_eq!(body[field], json!(["This field is required."]), "{field}");
    }
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let resp = send(request(
        Method::POST,
        "/auth/users",
        Some(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "12345678",
        })),
        None,
    ))
    .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json()["password"],
        json!(["This password is entirely numeric."])
    );
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let mut req = request(Method::POST, "/auth/users", None, None);
    req.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        "application/json".parse().expect("header value"),
    );
    *req.body_mut() = axum::body::Body::from("{not json");

    let resp = send(req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["detail"].is_string());
}

#[tokio::test]
async fn test_create_token_requires_fields() {
    let resp = send(request(
        Method::POST,
        "/auth/jwt/create",
        Some(&json!({ "username": "alice" })),
        None,
    ))
    .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json(),
        json!({ "password": ["This field is required."] })
    );
}

#[tokio::test]
async fn test_verify_accepts_both_token_types() {
    for token in [access_token(1, false), refresh_token(1)] {
        let resp = send(request(
            Method::POST,
            "/auth/jwt/verify",
            Some(&json!({ "token": token })),
            None,
        ))
        .await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json(), json!({}));
    }
}

#[tokio::test]
async fn test_verify_rejects_garbage() {
    let resp = send(request(
        Method::POST,
        "/auth/jwt/verify",
        Some(&json!({ "token": "not.a.token" })),
        None,
    ))
    .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["code"], "token_not_valid");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let resp = send(request(
        Method::POST,
        "/auth/jwt/refresh",
        Some(&json!({ "refresh": access_token(1, false) })),
        None,
    ))
    .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["code"], "token_not_valid");
}

#[tokio::test]
async fn test_refresh_requires_token() {
    let resp = send(request(Method::POST, "/auth/jwt/refresh", Some(&json!({})), None)).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json(), json!({ "refresh": ["This field is required."] }));
}

#[tokio::test]
async fn test_me_requires_credentials() {
    let resp = send(request(Method::GET, "/auth/users/me", None, None)).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json(),
        json!({ "detail": "Authentication credentials were not provided." })
    );
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let token = refresh_token(1);
    let resp = send(request(Method::GET, "/auth/users/me", None, Some(&token))).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["code"], "token_not_valid");
}

#[tokio::test]
async fn test_unknown_scheme_is_anonymous() {
    let mut req = request(Method::GET, "/auth/users/me", None, None);
    req.headers_mut().insert(
        axum::http::header::AUTHORIZATION,
        "Basic YWxpY2U6c2VjcmV0".parse().expect("header value"),
    );

    let resp = send(req).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.json()["detail"],
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_rate_limit() {
    let mut app = test_app();
    let body = json!({"username": "alice"});

    let mut statuses = Vec::new();
    for n in 1..=6 {
        let mut req = request(Method::POST, "/auth/jwt/create", Some(&body), None);
        req.headers_mut().insert(
            "x-forwarded-for",
            format!("198.51.100.{n}").parse().expect("header value"),
        );
        statuses.push(send_to(&mut app, req).await.status);
    }

    assert_eq!(&statuses[..5], &[StatusCode::BAD_REQUEST; 5]);
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}
