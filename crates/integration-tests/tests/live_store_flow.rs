//! End-to-end checkout against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`storefront-cli migrate`)
//! - Demo catalog data (`storefront-cli seed`)
//! - The server running (`cargo run -p storefront`)
//!
//! Run with: `cargo test -p storefront-integration-tests -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use storefront_integration_tests::live_base_url;

struct Session {
    client: Client,
    base: String,
    access: String,
}

impl Session {
    /// Register a fresh user and log in.
    async fn new() -> Self {
        let client = Client::new();
        let base = live_base_url();
        let username = format!("buyer_{}", Uuid::new_v4().simple());
        let password = "correct-horse-battery";

        let resp = client
            .post(format!("{base}/auth/users"))
            .json(&json!({
                "username": username,
                "password": password,
                "email": format!("{username}@example.com"),
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let tokens: Value = client
            .post(format!("{base}/auth/jwt/create"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("token request")
            .json()
            .await
            .expect("token body");

        let access = tokens["access"].as_str().expect("access token").to_owned();
        assert!(tokens["refresh"].is_string());

        Self {
            client,
            base,
            access,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("JWT {}", self.access))
            .send()
            .await
            .expect("GET request")
    }

    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("JWT {}", self.access))
            .json(body)
            .send()
            .await
            .expect("POST request")
    }
}

/// First product from the seeded catalog.
async fn any_product(session: &Session) -> Value {
    let page: Value = session
        .get("/store/products?ordering=title")
        .await
        .json()
        .await
        .expect("product page");

    page["results"][0].clone()
}

#[tokio::test]
#[ignore = "Requires a running server and seeded database"]
async fn test_registration_creates_customer() {
    let session = Session::new().await;

    let resp = session.get("/store/customers/me").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let customer: Value = resp.json().await.expect("customer body");
    assert_eq!(customer["membership"], "B");
}

#[tokio::test]
#[ignore = "Requires a running server and seeded database"]
async fn test_duplicate_username_conflicts() {
    let client = Client::new();
    let base = live_base_url();
    let username = format!("dup_{}", Uuid::new_v4().simple());
    let body = json!({
        "username": username,
        "password": "correct-horse-battery",
        "email": format!("{username}@example.com"),
    });

    let first = client
        .post(format!("{base}/auth/users"))
        .json(&body)
        .send()
        .await
        .expect("register request");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(format!("{base}/auth/users"))
        .json(&body)
        .send()
        .await
        .expect("register request");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires a running server and seeded database"]
async fn test_cart_to_order() {
    let session = Session::new().await;
    let product = any_product(&session).await;
    let product_id = product["id"].as_i64().expect("product id");

    // Anonymous cart
    let resp = session.post("/store/carts", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cart: Value = resp.json().await.expect("cart body");
    let cart_id = cart["id"].as_str().expect("cart id").to_owned();
    assert_eq!(cart["items"], json!([]));

    // Adding the same product twice merges the line
    for quantity in [1, 2] {
        let resp = session
            .post(
                &format!("/store/carts/{cart_id}/items"),
                &json!({ "product_id": product_id, "quantity": quantity }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let cart: Value = session
        .get(&format!("/store/carts/{cart_id}"))
        .await
        .json()
        .await
        .expect("cart body");
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["items"][0]["quantity"], 3);

    // Checkout
    let resp = session
        .post("/store/orders", &json!({ "cart_id": cart_id }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.expect("order body");
    assert_eq!(order["payment_status"], "P");
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(order["items"][0]["unit_price"], product["price"]);

    // The cart is consumed
    let resp = session.get(&format!("/store/carts/{cart_id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // And the order is listed for its owner
    let orders: Value = session
        .get("/store/orders")
        .await
        .json()
        .await
        .expect("orders body");
    assert!(
        orders
            .as_array()
            .expect("order list")
            .iter()
            .any(|o| o["id"] == order["id"])
    );
}

#[tokio::test]
#[ignore = "Requires a running server and seeded database"]
async fn test_empty_cart_cannot_be_ordered() {
    let session = Session::new().await;

    let cart: Value = session
        .post("/store/carts", &json!({}))
        .await
        .json()
        .await
        .expect("cart body");

    let resp = session
        .post("/store/orders", &json!({ "cart_id": cart["id"] }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body, json!({ "cart_id": ["Cart is empty"] }));
}

#[tokio::test]
#[ignore = "Requires a running server and seeded database"]
async fn test_likes_round_trip() {
    let session = Session::new().await;
    let product = any_product(&session).await;
    let path = format!("/likes/store.product/{}", product["id"]);

    let resp = session.post(&path, &json!({})).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let likes: Value = session.get("/likes/me").await.json().await.expect("likes");
    assert!(
        likes
            .as_array()
            .expect("like list")
            .iter()
            .any(|l| l["object_id"] == product["id"])
    );

    let resp = session
        .client
        .delete(session.url(&path))
        .header("Authorization", format!("JWT {}", session.access))
        .send()
        .await
        .expect("DELETE request");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
