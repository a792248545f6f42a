//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness check
//! GET  /health/ready                            - Readiness check (database)
//! GET  /media/*                                 - Uploaded files
//!
//! # Auth
//! POST /auth/users                              - Register (rate limited)
//! GET  /auth/users/me                           - Own account
//! PUT  /auth/users/me                           - Update own account
//! POST /auth/jwt/create                         - Token pair (rate limited)
//! POST /auth/jwt/refresh                        - New access token
//! POST /auth/jwt/verify                         - Check a token
//!
//! # Catalog (writes require staff)
//! GET|POST        /store/collections
//! GET|PUT|DELETE  /store/collections/{id}
//! GET|POST        /store/products               - Paginated, filterable
//! GET|PUT|PATCH|DELETE /store/products/{id}
//! GET|POST        /store/products/{product_pk}/reviews
//! GET|PUT|DELETE  /store/products/{product_pk}/reviews/{id}
//! GET|POST        /store/products/{product_pk}/images
//! GET|DELETE      /store/products/{product_pk}/images/{id}
//! GET|POST        /store/products/{product_pk}/promotions
//! DELETE          /store/products/{product_pk}/promotions/{promotion_id}
//! GET|POST        /store/promotions
//! GET|DELETE      /store/promotions/{id}
//!
//! # Carts (anonymous, addressed by UUID)
//! POST            /store/carts
//! GET|DELETE      /store/carts/{id}
//! GET|POST        /store/carts/{cart_pk}/items
//! GET|PATCH|DELETE /store/carts/{cart_pk}/items/{id}
//!
//! # Customers and orders
//! GET             /store/customers              - Staff
//! GET|PUT         /store/customers/{id}         - Staff
//! GET|PUT         /store/customers/me
//! GET|POST        /store/customers/me/addresses
//! DELETE          /store/customers/me/addresses/{id}
//! GET|POST        /store/orders
//! GET|PATCH|DELETE /store/orders/{id}           - Writes require staff
//!
//! # Generic relations
//! GET|POST        /tags
//! GET|POST        /tags/{content_type}/{object_id}
//! DELETE          /tags/{content_type}/{object_id}/{id}
//! GET             /likes/me
//! POST|DELETE     /likes/{content_type}/{object_id}
//! ```

pub mod auth;
pub mod carts;
pub mod collections;
pub mod customers;
pub mod extract;
pub mod health;
pub mod images;
pub mod likes;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod tags;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{delete, get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::{AppError, NOT_FOUND};
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the auth routes router.
///
/// `trust_proxy_headers` selects how the credential rate limiter identifies
/// clients (see [`auth_rate_limiter`]).
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let limited = Router::new()
        .route("/users", post(auth::register))
        .route("/jwt/create", post(auth::create_token))
        .route_layer(auth_rate_limiter(trust_proxy_headers));

    Router::new()
        .route("/users/me", get(auth::me).put(auth::update_me))
        .route("/jwt/refresh", post(auth::refresh_token))
        .route("/jwt/verify", post(auth::verify_token))
        .merge(limited)
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(collections::index).post(collections::create),
        )
        .route(
            "/collections/{id}",
            get(collections::show)
                .put(collections::update)
                .delete(collections::destroy),
        )
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .patch(products::partial_update)
                .delete(products::destroy),
        )
        .route(
            "/products/{product_pk}/reviews",
            get(reviews::index).post(reviews::create),
        )
        .route(
            "/products/{product_pk}/reviews/{id}",
            get(reviews::show)
                .put(reviews::update)
                .delete(reviews::destroy),
        )
        .route(
            "/products/{product_pk}/images",
            get(images::index).post(images::create),
        )
        .route(
            "/products/{product_pk}/images/{id}",
            get(images::show).delete(images::destroy),
        )
        .route(
            "/products/{product_pk}/promotions",
            get(promotions::product_index).post(promotions::attach),
        )
        .route(
            "/products/{product_pk}/promotions/{promotion_id}",
            delete(promotions::detach),
        )
        .route(
            "/promotions",
            get(promotions::index).post(promotions::create),
        )
        .route(
            "/promotions/{id}",
            get(promotions::show).delete(promotions::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(carts::create))
        .route("/{id}", get(carts::show).delete(carts::destroy))
        .route(
            "/{cart_pk}/items",
            get(carts::items).post(carts::add_item),
        )
        .route(
            "/{cart_pk}/items/{id}",
            get(carts::show_item)
                .patch(carts::update_item)
                .delete(carts::remove_item),
        )
}

/// Create the customer and order routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(customers::index))
        .route("/customers/me", get(customers::me).put(customers::update_me))
        .route(
            "/customers/me/addresses",
            get(customers::addresses).post(customers::create_address),
        )
        .route(
            "/customers/me/addresses/{id}",
            delete(customers::delete_address),
        )
        .route(
            "/customers/{id}",
            get(customers::show).put(customers::update),
        )
        .route("/orders", get(orders::index).post(orders::create))
        .route(
            "/orders/{id}",
            get(orders::show)
                .patch(orders::update)
                .delete(orders::destroy),
        )
}

/// Create the tag and like routes router.
pub fn relation_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tags::index).post(tags::create))
        .route(
            "/tags/{content_type}/{object_id}",
            get(tags::for_object).post(tags::attach),
        )
        .route(
            "/tags/{content_type}/{object_id}/{id}",
            delete(tags::detach),
        )
        .route("/likes/me", get(likes::mine))
        .route(
            "/likes/{content_type}/{object_id}",
            post(likes::like).delete(likes::unlike),
        )
}

/// Create all API routes (without state or outer layers).
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes(trust_proxy_headers))
        .nest(
            "/store",
            catalog_routes()
                .merge(account_routes())
                .nest("/carts", cart_routes()),
        )
        .merge(relation_routes())
        .fallback(not_found)
}

/// Build the complete application router with state and middleware.
///
/// Layers, outermost first: Sentry, tracing, request ID, security headers.
pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(state.media().root());
    let trust_proxy_headers = state.config().trust_proxy_headers;

    Router::new()
        .merge(routes(trust_proxy_headers))
        .nest_service("/media", media)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

async fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND.to_owned())
}
