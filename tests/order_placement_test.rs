mod common;

use axum::{routing::post, Json, Router};
use common::{post_json, TestApp};
use sea_orm::EntityTrait;
use serde_json::json;
use storefront_api::entities::{order, CartItem, Order, OrderItem};
use storefront_api::gateway::StripeGateway;
use uuid::Uuid;

/// Stand-in for the gateway's checkout-session endpoint.
async fn stub_gateway() -> String {
    let app = Router::new().route(
        "/v1/checkout/sessions",
        post(|| async {
            Json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.example.com/pay/cs_test_123",
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway_at(api_base: &str) -> StripeGateway {
    StripeGateway::new("sk_test_xxx".into(), Some("whsec_test".into()), 300).with_api_base(api_base)
}

#[tokio::test]
async fn cod_order_rejects_missing_address() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let product_id = app.seed_product("Widget", 100).await;

    let (status, body) = post_json(
        app.router(),
        "/api/v1/orders/cod",
        json!({
            "user_id": user_id,
            "items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;

    // Lenient envelope: failure is reported in the body, not the status.
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Address"));

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn cod_order_rejects_empty_items() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;

    let (status, body) = post_json(
        app.router(),
        "/api/v1/orders/cod",
        json!({
            "user_id": user_id,
            "address_id": address_id,
            "items": [],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn cod_order_persists_unpaid_with_taxed_amount() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;
    let product_id = app.seed_product("Widget", 100).await;

    let (status, body) = post_json(
        app.router(),
        "/api/v1/orders/cod",
        json!({
            "user_id": user_id,
            "address_id": address_id,
            "items": [{ "product_id": product_id, "quantity": 2 }],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    // The COD variant exposes no order identifier.
    assert!(body.get("order_id").is_none());

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let placed = &orders[0];
    // subtotal 200 + floor(2%) = 204
    assert_eq!(placed.amount, 204);
    assert_eq!(placed.payment_type, order::PaymentType::Cod);
    assert!(!placed.is_paid);
    assert_eq!(placed.user_id, user_id);
    assert_eq!(placed.address_id, address_id);

    let items = OrderItem::find().all(&*app.state.db).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, product_id);
    assert_eq!(items[0].quantity, 2);
}

#[tokio::test]
async fn cod_order_fails_on_unknown_product() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;

    let (status, body) = post_json(
        app.router(),
        "/api/v1/orders/cod",
        json!({
            "user_id": user_id,
            "address_id": address_id,
            "items": [{ "product_id": Uuid::new_v4(), "quantity": 1 }],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("not found"));

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn online_order_without_gateway_settles_as_demo_and_clears_cart() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;
    let product_id = app.seed_product("Gadget", 499).await;
    app.add_cart_item(user_id, product_id, 3).await;

    let (status, body) = post_json(
        app.router_as(user_id),
        "/api/v1/orders/online",
        json!({
            "address_id": address_id,
            "items": [{ "product_id": product_id, "quantity": 3 }],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["simulated"], true);
    let order_id: Uuid = serde_json::from_value(body["order_id"].clone()).unwrap();

    let placed = Order::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("Demo order should exist");
    assert_eq!(placed.payment_type, order::PaymentType::OnlineDemo);
    assert!(placed.is_paid);
    // subtotal 1497 + floor(29.94) = 1526
    assert_eq!(placed.amount, 1526);

    let cart = CartItem::find().all(&*app.state.db).await.unwrap();
    assert!(cart.is_empty(), "Demo settlement must clear the cart");
}

#[tokio::test]
async fn online_order_with_gateway_redirects_and_defers_cart_clear() {
    let api_base = stub_gateway().await;
    let app = TestApp::with_gateway(Some(gateway_at(&api_base))).await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;
    let product_id = app.seed_product("Widget", 100).await;
    app.add_cart_item(user_id, product_id, 2).await;

    let (status, body) = post_json(
        app.router_as(user_id),
        "/api/v1/orders/online",
        json!({
            "address_id": address_id,
            "items": [{ "product_id": product_id, "quantity": 2 }],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["url"],
        "https://checkout.example.com/pay/cs_test_123"
    );
    assert!(body.get("simulated").is_none());

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    let placed = &orders[0];
    assert_eq!(placed.payment_type, order::PaymentType::Online);
    assert!(!placed.is_paid, "Order is unpaid until the webhook arrives");
    assert_eq!(placed.amount, 204);

    // Settlement is deferred to the webhook, so the cart survives placement.
    let cart = CartItem::find().all(&*app.state.db).await.unwrap();
    assert_eq!(cart.len(), 1);
}

#[tokio::test]
async fn online_order_with_unreachable_gateway_leaves_orphaned_unpaid_order() {
    // Nothing listens on port 1; session creation fails after the order
    // insert, with no compensating cleanup.
    let app = TestApp::with_gateway(Some(gateway_at("http://127.0.0.1:1"))).await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;
    let product_id = app.seed_product("Widget", 100).await;
    app.add_cart_item(user_id, product_id, 1).await;

    let (status, body) = post_json(
        app.router_as(user_id),
        "/api/v1/orders/online",
        json!({
            "address_id": address_id,
            "items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);

    let orders = Order::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].is_paid);
    assert_eq!(orders[0].payment_type, order::PaymentType::Online);

    let cart = CartItem::find().all(&*app.state.db).await.unwrap();
    assert_eq!(cart.len(), 1, "Failed placement must not touch the cart");
}

#[tokio::test]
async fn online_order_rejects_empty_items() {
    let app = TestApp::new().await;
    let user_id = app.seed_user().await;
    let address_id = app.seed_address(user_id).await;

    let (status, body) = post_json(
        app.router_as(user_id),
        "/api/v1/orders/online",
        json!({ "address_id": address_id, "items": [] }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert!(Order::find().all(&*app.state.db).await.unwrap().is_empty());
}
