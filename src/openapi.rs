use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::orders::place_cod_order,
        crate::handlers::orders::place_online_order,
        crate::handlers::orders::get_user_orders,
        crate::handlers::orders::get_all_orders,
        crate::handlers::payment_webhooks::payment_webhook,
    ),
    components(schemas(
        crate::handlers::orders::OrderItemRequest,
        crate::handlers::orders::PlaceCodOrderRequest,
        crate::handlers::orders::PlaceOnlineOrderRequest,
        crate::handlers::orders::PlaceOrderResponse,
        crate::handlers::orders::PlaceOnlineOrderResponse,
        crate::handlers::orders::OrderListResponse,
        crate::services::orders::OrderDetails,
        crate::services::orders::OrderLineDetails,
        crate::entities::product::Model,
        crate::entities::address::Model,
        crate::entities::order::PaymentType,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "Orders", description = "Order placement and queries"),
        (name = "Payments", description = "Payment gateway callbacks")
    ),
    info(
        title = "Storefront API",
        description = "Order placement, hosted checkout, and payment reconciliation"
    )
)]
pub struct ApiDoc;
