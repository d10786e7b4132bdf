//! Route-level tests: auth gating, status codes, and JSON bodies,
//! driven through the router with `tower::ServiceExt::oneshot`.

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{harness, seed_product, token_for};
use pomelo_api::routes;
use pomelo_api::store::CatalogStore;
use pomelo_core::UserId;
use serde_json::{Value, json};
use tower::ServiceExt;

const USER: UserId = UserId::new(1);

fn router(h: &common::TestHarness) -> Router {
    Router::new().merge(routes::routes()).with_state(h.state.clone())
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn add_body(product_id: i32, quantity: i32) -> Value {
    json!({
        "product_id": product_id,
        "quantity": quantity,
        "color": "black",
        "size": "m",
    })
}

fn checkout_body(product_id: i32, quantity: i32, total: &str) -> Value {
    json!({
        "order_items": [{ "product_id": product_id, "quantity": quantity }],
        "shipping_address": {
            "email": "jo@example.com",
            "phone": "+14155550123",
            "address": "1 Market St",
            "city": "San Francisco",
            "postal_code": "94105",
            "country": "US",
        },
        "payment_method": "card",
        "payment_token": "pm_card_visa",
        "items_price": total,
        "tax_price": "0",
        "shipping_price": "0",
        "total_price": total,
    })
}

#[tokio::test]
async fn cart_routes_require_a_bearer_token() {
    let h = harness();
    let app = router(&h);

    let (status, _) = send(&app, "GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/cart", None, Some(add_body(1, 1))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_customer_tokens() {
    let h = harness();
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, _) = send(&app, "GET", "/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn products_are_public() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let app = router(&h);

    let (status, body) = send(&app, "GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, "GET", &format!("/products/{}", product.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "tee");

    let (status, _) = send(&app, "GET", "/products/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_cart_before_first_add_is_404() {
    let h = harness();
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, _) = send(&app, "GET", "/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_to_cart_returns_the_updated_cart() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, body) = send(
        &app,
        "POST",
        "/cart",
        Some(&token),
        Some(add_body(product.id.get(), 2)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["lines"][0]["quantity"], 2);
}

#[tokio::test]
async fn overcommitting_merge_is_400_with_stock_detail() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 5).await;
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, _) = send(
        &app,
        "POST",
        "/cart",
        Some(&token),
        Some(add_body(product.id.get(), 3)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/cart",
        Some(&token),
        Some(add_body(product.id.get(), 3)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|m| m.contains("insufficient stock")),
        "body: {body}"
    );
}

#[tokio::test]
async fn checkout_creates_an_order_with_201() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout_body(product.id.get(), 2, "100.00")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_paid"], false);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn checkout_validation_lists_every_violated_field() {
    let h = harness();
    let app = router(&h);
    let token = token_for(USER, false);

    let mut body = checkout_body(1, 1, "50.00");
    body["shipping_address"]["email"] = json!("not-an-email");
    body["shipping_address"]["phone"] = json!("123");

    let (status, body) = send(&app, "POST", "/orders", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("fields listed")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"shipping_address.email"));
    assert!(fields.contains(&"shipping_address.phone"));
}

#[tokio::test]
async fn declined_card_maps_to_402() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    h.gateway.push_error(
        pomelo_api::services::payment::PaymentError::Card("Your card was declined.".to_owned()),
    );
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout_body(product.id.get(), 1, "50.00")),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Your card was declined.");
}

#[tokio::test]
async fn idempotency_key_header_makes_checkout_replay_safe() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let token = token_for(USER, false);

    let request = |app: &Router| {
        let body = checkout_body(product.id.get(), 2, "100.00");
        let req = Request::builder()
            .method("POST")
            .uri("/orders")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .header("idempotency-key", "ck_http_retry")
            .body(Body::from(body.to_string()))
            .expect("request");
        app.clone().oneshot(req)
    };

    let first = request(&app).await.expect("first");
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_body: Value = serde_json::from_slice(
        &to_bytes(first.into_body(), usize::MAX).await.expect("body"),
    )
    .expect("json");

    let second = request(&app).await.expect("second");
    assert_eq!(second.status(), StatusCode::CREATED);
    let second_body: Value = serde_json::from_slice(
        &to_bytes(second.into_body(), usize::MAX).await.expect("body"),
    )
    .expect("json");

    assert_eq!(first_body["id"], second_body["id"]);

    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 8, "decremented once across both calls");
}

#[tokio::test]
async fn pay_twice_is_rejected_with_400() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let token = token_for(USER, false);

    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout_body(product.id.get(), 1, "50.00")),
    )
    .await;
    let order_id = order["id"].as_i64().expect("order id");

    let uri = format!("/orders/{order_id}/pay");
    let (status, body) = send(&app, "PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_paid"], true);

    let (status, _) = send(&app, "PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deliver_and_delete_are_admin_only() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let user_token = token_for(USER, false);
    let admin_token = token_for(UserId::new(99), true);

    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&user_token),
        Some(checkout_body(product.id.get(), 1, "50.00")),
    )
    .await;
    let order_id = order["id"].as_i64().expect("order id");

    let deliver = format!("/orders/{order_id}/deliver");
    let (status, _) = send(&app, "PUT", &deliver, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", &deliver, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_delivered"], true);

    let delete = format!("/orders/{order_id}");
    let (status, _) = send(&app, "DELETE", &delete, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &delete, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &delete, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_orders_read_as_404() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let owner = token_for(USER, false);
    let stranger = token_for(UserId::new(2), false);
    let admin = token_for(UserId::new(99), true);

    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&owner),
        Some(checkout_body(product.id.get(), 1, "50.00")),
    )
    .await;
    let uri = format!("/orders/{}", order["id"].as_i64().expect("id"));

    let (status, _) = send(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_payment_intent_returns_the_client_secret() {
    let h = harness();
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, body) = send(
        &app,
        "POST",
        "/create-payment-intent",
        Some(&token),
        Some(json!({ "amount": "42.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_secret"], "cs_test_secret");
}

#[tokio::test]
async fn provider_fault_on_intent_is_502() {
    let h = harness();
    h.gateway
        .push_error(pomelo_api::services::payment::PaymentError::Api("provider down".to_owned()));
    let app = router(&h);
    let token = token_for(USER, false);

    let (status, body) = send(
        &app,
        "POST",
        "/create-payment-intent",
        Some(&token),
        Some(json!({ "amount": "42.00" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "payment provider unavailable, please try again");
}

#[tokio::test]
async fn recording_a_payment_conflicts_when_one_exists() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    let app = router(&h);
    let token = token_for(USER, false);

    // An order created outside checkout's own payment path.
    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&token),
        Some(checkout_body(product.id.get(), 1, "50.00")),
    )
    .await;
    let order_id = order["id"].as_i64().expect("order id");

    let payment = json!({
        "order_id": order_id,
        "payment_method": "card",
        "payment_result": { "id": "pi_x", "status": "succeeded" },
        "amount": "50.00",
    });

    // Checkout already recorded a payment for this order.
    let (status, _) = send(&app, "POST", "/payments", Some(&token), Some(payment)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let missing = json!({
        "order_id": 404,
        "payment_method": "card",
        "payment_result": { "id": "pi_x", "status": "succeeded" },
        "amount": "50.00",
    });
    let (status, _) = send(&app, "POST", "/payments", Some(&token), Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
