//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use store::MemoryStore;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let state = api::AppState::new(MemoryStore::new());
    api::create_app(state, get_metrics_handle())
}

fn request(
    method: &str,
    uri: &str,
    identity: Option<(Uuid, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = identity {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role);
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_medicine(
    app: &axum::Router,
    seller: Uuid,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/medicine",
            Some((seller, "SELLER")),
            Some(json!({ "name": name, "price_cents": price_cents, "stock": stock })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn add_to_cart(app: &axum::Router, customer: Uuid, medicine_id: &str, quantity: u32) {
    let (status, _) = send(
        app,
        request(
            "PUT",
            "/cart/items",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine_id, "quantity": quantity })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn place_order(app: &axum::Router, customer: Uuid) -> (StatusCode, Value) {
    send(
        app,
        request(
            "POST",
            "/order",
            Some((customer, "CUSTOMER")),
            Some(json!({
                "shipping_phone": "555-0100",
                "shipping_address": "1 Main St"
            })),
        ),
    )
    .await
}

async fn medicine_stock(app: &axum::Router, seller: Uuid, medicine_id: &str) -> i64 {
    let (status, body) = send(
        app,
        request(
            "GET",
            &format!("/medicine/{medicine_id}"),
            Some((seller, "SELLER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let app = setup();

    let (status, _) = send(&app, request("GET", "/order", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(
            "GET",
            "/order",
            Some((Uuid::new_v4(), "SUPERUSER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_place_order_full_flow() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let m1 = create_medicine(&app, seller, "Paracetamol 500mg", 1000, 10).await;
    let m2 = create_medicine(&app, seller, "Vitamin C", 500, 10).await;

    add_to_cart(&app, customer, &m1, 3).await;
    add_to_cart(&app, customer, &m2, 1).await;

    let (status, body) = place_order(&app, customer).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PLACED");
    assert_eq!(body["data"]["total_cents"], 3500);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    // Stock was reserved per line.
    assert_eq!(medicine_stock(&app, seller, &m1).await, 7);
    assert_eq!(medicine_stock(&app, seller, &m2).await, 9);

    // The cart was emptied by the checkout.
    let (status, cart) = send(
        &app,
        request("GET", "/cart", Some((customer, "CUSTOMER")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["data"]["items"].as_array().unwrap().is_empty());

    // The order shows up in the customer's listing.
    let (status, listing) = send(
        &app,
        request("GET", "/order", Some((customer, "CUSTOMER")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_place_order_with_empty_cart() {
    let app = setup();

    let (status, body) = place_order(&app, Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");
}

#[tokio::test]
async fn test_place_order_requires_shipping_fields() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Ibuprofen", 800, 5).await;
    add_to_cart(&app, customer, &medicine, 1).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/order",
            Some((customer, "CUSTOMER")),
            Some(json!({ "shipping_phone": "555-0100" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was committed.
    assert_eq!(medicine_stock(&app, seller, &medicine).await, 5);
}

#[tokio::test]
async fn test_place_order_with_insufficient_stock() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Insulin", 2500, 2).await;
    add_to_cart(&app, customer, &medicine, 5).await;

    let (status, _) = place_order(&app, customer).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(medicine_stock(&app, seller, &medicine).await, 2);
}

#[tokio::test]
async fn test_concurrent_orders_for_the_last_unit() {
    let app = setup();
    let seller = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Epinephrine", 9900, 1).await;
    add_to_cart(&app, first, &medicine, 1).await;
    add_to_cart(&app, second, &medicine, 1).await;

    let ((status_a, _), (status_b, _)) =
        tokio::join!(place_order(&app, first), place_order(&app, second));

    let mut statuses = [status_a, status_b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    assert_eq!(medicine_stock(&app, seller, &medicine).await, 0);
}

#[tokio::test]
async fn test_customer_cannot_create_medicine() {
    let app = setup();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/medicine",
            Some((Uuid::new_v4(), "CUSTOMER")),
            Some(json!({ "name": "Contraband", "price_cents": 100, "stock": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_self_cancel_restores_stock_and_guards_later_states() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Aspirin", 600, 5).await;
    add_to_cart(&app, customer, &medicine, 3).await;
    let (_, body) = place_order(&app, customer).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(medicine_stock(&app, seller, &medicine).await, 2);

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/order/{order_id}/cancel"),
            Some((customer, "CUSTOMER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");
    assert_eq!(medicine_stock(&app, seller, &medicine).await, 5);

    // A processing order can no longer be self-cancelled.
    add_to_cart(&app, customer, &medicine, 2).await;
    let (_, body) = place_order(&app, customer).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/order/seller/{order_id}/status"),
            Some((admin, "ADMIN")),
            Some(json!({ "status": "PROCESSING" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/order/{order_id}/cancel"),
            Some((customer, "CUSTOMER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(medicine_stock(&app, seller, &medicine).await, 3);

    let (status, body) = send(
        &app,
        request(
            "GET",
            &format!("/order/{order_id}/track"),
            Some((customer, "CUSTOMER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "status": "PROCESSING" }));
}

#[tokio::test]
async fn test_seller_status_transitions_and_scope() {
    let app = setup();
    let seller = Uuid::new_v4();
    let foreign_seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Metformin", 1200, 10).await;
    add_to_cart(&app, customer, &medicine, 1).await;
    let (_, body) = place_order(&app, customer).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/order/seller/{order_id}/status");

    // A seller with no lines in the order is rejected.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &status_uri,
            Some((foreign_seller, "SELLER")),
            Some(json!({ "status": "SHIPPED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An unknown status value is a validation failure.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &status_uri,
            Some((seller, "SELLER")),
            Some(json!({ "status": "RETURNED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // PLACED cannot jump straight to SHIPPED.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &status_uri,
            Some((seller, "SELLER")),
            Some(json!({ "status": "SHIPPED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The legal path works, and a repeat is an idempotent no-op.
    for target in ["CONFIRMS", "PROCESSING", "PROCESSING", "SHIPPED", "DELIVERED"] {
        let (status, body) = send(
            &app,
            request(
                "PATCH",
                &status_uri,
                Some((seller, "SELLER")),
                Some(json!({ "status": target })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "transition to {target}");
        assert_eq!(body["data"]["status"], *target);
    }

    // DELIVERED is terminal.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &status_uri,
            Some((seller, "SELLER")),
            Some(json!({ "status": "CANCELLED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_visibility_is_scoped() {
    let app = setup();
    let seller = Uuid::new_v4();
    let other_seller = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Omeprazole", 900, 10).await;
    add_to_cart(&app, customer, &medicine, 1).await;
    let (_, body) = place_order(&app, customer).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    let order_uri = format!("/order/{order_id}");

    // Another customer cannot see the order, and existence is not leaked.
    let (status, _) = send(
        &app,
        request("GET", &order_uri, Some((stranger, "CUSTOMER")), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A seller without lines in the order cannot see it either.
    let (status, _) = send(
        &app,
        request("GET", &order_uri, Some((other_seller, "SELLER")), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The selling seller and an admin can.
    let (status, _) = send(
        &app,
        request("GET", &order_uri, Some((seller, "SELLER")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request("GET", &order_uri, Some((Uuid::new_v4(), "ADMIN")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cart_snapshot_price_refresh_and_zero_removal() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Cetirizine", 1000, 10).await;
    add_to_cart(&app, customer, &medicine, 2).await;

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/medicine/{medicine}"),
            Some((seller, "SELLER")),
            Some(json!({ "price_cents": 1200 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Touching the line refreshes the snapshot to the new price.
    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/cart/items",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "quantity": 3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["quantity"], 3);
    assert_eq!(body["data"]["items"][0]["unit_price"], 1200);

    // Quantity zero deletes the line.
    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/cart/items",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "quantity": 0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_review_requires_delivery_and_is_unique() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Loratadine", 700, 10).await;

    // No delivered order yet.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/review",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "rating": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    add_to_cart(&app, customer, &medicine, 1).await;
    let (_, body) = place_order(&app, customer).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    for target in ["PROCESSING", "SHIPPED", "DELIVERED"] {
        let (status, _) = send(
            &app,
            request(
                "PATCH",
                &format!("/order/seller/{order_id}/status"),
                Some((admin, "ADMIN")),
                Some(json!({ "status": target })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Rating must stay on the 1..=5 scale.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/review",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "rating": 6 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/review",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "rating": 4, "comment": "Works well" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["rating"], 4);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/review",
            Some((customer, "CUSTOMER")),
            Some(json!({ "medicine_id": medicine, "rating": 2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        request("GET", &format!("/medicine/{medicine}/reviews"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_inactive_medicine_is_hidden_and_unbuyable() {
    let app = setup();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();

    let medicine = create_medicine(&app, seller, "Codeine", 2000, 10).await;
    add_to_cart(&app, customer, &medicine, 1).await;

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/medicine/{medicine}"),
            Some((seller, "SELLER")),
            Some(json!({ "is_active": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The public catalog no longer shows it.
    let (status, body) = send(&app, request("GET", "/medicine", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/medicine/{medicine}"),
            Some((customer, "CUSTOMER")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Checkout of a cart that still holds it fails without side effects.
    let (status, _) = place_order(&app, customer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(medicine_stock(&app, seller, &medicine).await, 10);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
