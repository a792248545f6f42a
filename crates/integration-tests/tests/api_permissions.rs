//! In-process tests for staff-only routes and request validation.
//!
//! Authentication and permission checks run in extractors, so these
//! requests are rejected before any query.

use axum::http::{Method, StatusCode};
use serde_json::json;

use storefront_integration_tests::{access_token, request, send};

const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

#[tokio::test]
async fn test_catalog_writes_require_staff() {
    let token = access_token(7, false);
    let cases = [
        (Method::POST, "/store/collections"),
        (Method::PUT, "/store/collections/1"),
        (Method::DELETE, "/store/collections/1"),
        (Method::POST, "/store/products"),
        (Method::PATCH, "/store/products/1"),
        (Method::DELETE, "/store/products/1"),
        (Method::POST, "/store/promotions"),
        (Method::PUT, "/store/products/1/reviews/1"),
        (Method::DELETE, "/store/products/1/images/1"),
        (Method::GET, "/store/customers"),
        (Method::PATCH, "/store/orders/1"),
        (Method::DELETE, "/store/orders/1"),
    ];

    for (method, uri) in cases {
        let resp = send(request(method.clone(), uri, Some(&json!({})), Some(&token))).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(resp.json(), json!({ "detail": PERMISSION_DENIED }));
    }
}

#[tokio::test]
async fn test_catalog_writes_require_authentication() {
    let resp = send(request(
        Method::POST,
        "/store/products",
        Some(&json!({ "title": "Tea" })),
        None,
    ))
    .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_orders_require_authentication() {
    for method in [Method::GET, Method::POST] {
        let resp = send(request(method.clone(), "/store/orders", None, None)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{method}");
    }
}

#[tokio::test]
async fn test_place_order_validates_cart_id() {
    let token = access_token(7, false);

    let resp = send(request(Method::POST, "/store/orders", Some(&json!({})), Some(&token))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json(), json!({ "cart_id": ["This field is required."] }));

    let resp = send(request(
        Method::POST,
        "/store/orders",
        Some(&json!({ "cart_id": "not-a-uuid" })),
        Some(&token),
    ))
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json(), json!({ "cart_id": ["Must be a valid UUID."] }));
}

#[tokio::test]
async fn test_malformed_ids_are_not_found() {
    for uri in [
        "/store/products/abc",
        "/store/collections/1.5",
        "/store/carts/not-a-uuid",
        "/store/carts/not-a-uuid/items",
    ] {
        let resp = send(request(Method::GET, uri, None, None)).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(resp.json(), json!({ "detail": "Not found." }));
    }
}

#[tokio::test]
async fn test_likes_require_authentication() {
    let resp = send(request(Method::GET, "/likes/me", None, None)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = send(request(Method::POST, "/likes/store.product/1", None, None)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
