use axum::{
    extract::{Extension, Json, State},
    http::header::ORIGIN,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    handlers::{common::flatten_error, CallerIdentity},
    services::orders::{OnlinePlacement, OrderDetails, OrderItemInput, PlaceOrderInput},
    AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/cod", post(place_cod_order))
        .route("/online", post(place_online_order))
        .route("/", get(get_user_orders))
        .route("/all", get(get_all_orders))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceCodOrderRequest {
    pub user_id: Uuid,
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOnlineOrderRequest {
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOnlineOrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<OrderDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn items_from(requests: Vec<OrderItemRequest>) -> Vec<OrderItemInput> {
    requests
        .into_iter()
        .map(|item| OrderItemInput {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect()
}

/// Place a cash-on-delivery order.
#[utoipa::path(
    post,
    path = "/api/v1/orders/cod",
    request_body = PlaceCodOrderRequest,
    responses(
        (status = 200, description = "Placement outcome; inspect `success`", body = PlaceOrderResponse)
    ),
    tag = "Orders"
)]
pub async fn place_cod_order(
    State(state): State<AppState>,
    Json(payload): Json<PlaceCodOrderRequest>,
) -> impl IntoResponse {
    let input = PlaceOrderInput {
        user_id: payload.user_id,
        address_id: payload.address_id,
        items: items_from(payload.items),
    };

    let response = match state.services.orders.place_cod_order(input).await {
        Ok(()) => PlaceOrderResponse {
            success: true,
            message: "Order placed successfully".to_string(),
        },
        Err(err) => PlaceOrderResponse {
            success: false,
            message: flatten_error("COD order placement", &err),
        },
    };
    Json(response)
}

/// Place an online-payment order for the authenticated caller. Responds with
/// a checkout redirect URL, or a simulated settlement when no payment
/// gateway is configured.
#[utoipa::path(
    post,
    path = "/api/v1/orders/online",
    request_body = PlaceOnlineOrderRequest,
    responses(
        (status = 200, description = "Placement outcome; inspect `success`", body = PlaceOnlineOrderResponse)
    ),
    tag = "Orders"
)]
pub async fn place_online_order(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    headers: HeaderMap,
    Json(payload): Json<PlaceOnlineOrderRequest>,
) -> impl IntoResponse {
    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    let input = PlaceOrderInput {
        user_id: identity.user_id,
        address_id: payload.address_id,
        items: items_from(payload.items),
    };

    let response = match state.services.orders.place_online_order(input, origin).await {
        Ok(OnlinePlacement::Redirect { url }) => PlaceOnlineOrderResponse {
            success: true,
            url: Some(url),
            simulated: None,
            message: None,
            order_id: None,
        },
        Ok(OnlinePlacement::Simulated { order_id }) => PlaceOnlineOrderResponse {
            success: true,
            url: None,
            simulated: Some(true),
            message: Some("Payment simulated; gateway is not configured".to_string()),
            order_id: Some(order_id),
        },
        Err(err) => PlaceOnlineOrderResponse {
            success: false,
            url: None,
            simulated: None,
            message: Some(flatten_error("Online order placement", &err)),
            order_id: None,
        },
    };
    Json(response)
}

/// List the authenticated caller's orders, newest first, with product and
/// address references expanded.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Caller's orders; inspect `success`", body = OrderListResponse)
    ),
    tag = "Orders"
)]
pub async fn get_user_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> impl IntoResponse {
    let response = match state.services.orders.list_for_user(identity.user_id).await {
        Ok(orders) => OrderListResponse {
            success: true,
            orders: Some(orders),
            message: None,
        },
        Err(err) => OrderListResponse {
            success: false,
            orders: None,
            message: Some(flatten_error("User order listing", &err)),
        },
    };
    Json(response)
}

/// List every order system-wide. Restricting who may call this is the outer
/// routing layer's concern.
#[utoipa::path(
    get,
    path = "/api/v1/orders/all",
    responses(
        (status = 200, description = "All orders; inspect `success`", body = OrderListResponse)
    ),
    tag = "Orders"
)]
pub async fn get_all_orders(State(state): State<AppState>) -> impl IntoResponse {
    let response = match state.services.orders.list_all().await {
        Ok(orders) => OrderListResponse {
            success: true,
            orders: Some(orders),
            message: None,
        },
        Err(err) => OrderListResponse {
            success: false,
            orders: None,
            message: Some(flatten_error("Order listing", &err)),
        },
    };
    Json(response)
}
