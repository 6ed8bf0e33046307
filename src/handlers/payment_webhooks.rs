use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use bytes::Bytes;
use tracing::info;

use crate::{errors::ServiceError, gateway::PaymentEventKind, AppState};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(payment_webhook))
}

/// Receives signed payment lifecycle events from the gateway. Unlike the
/// storefront endpoints this responds with real HTTP statuses: the gateway
/// inspects them to decide whether to redeliver, so the whole flow must stay
/// safe under at-least-once delivery.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Invalid signature or missing metadata", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced order unknown", body = crate::errors::ErrorResponse),
        (status = 500, description = "Reconciliation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    // Without a gateway there is nothing to reconcile; without a webhook
    // secret nothing can be verified. Either way the event is acknowledged
    // so the gateway stops redelivering it.
    let Some(gateway) = state.gateway.as_ref() else {
        info!("Webhook received while gateway is disabled; acknowledging");
        return Ok((StatusCode::OK, "ignored"));
    };
    if !gateway.verification_enabled() {
        info!("Webhook received without a configured secret; acknowledging unprocessed");
        return Ok((StatusCode::OK, "ignored"));
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::InvalidSignature("missing signature header".to_string()))?;

    let event = gateway.construct_event(&body, signature)?;

    match event.kind {
        PaymentEventKind::CheckoutSessionCompleted | PaymentEventKind::PaymentIntentSucceeded => {
            let metadata = event.data.object.metadata;
            let order_id = metadata.order_id.ok_or_else(|| {
                ServiceError::MissingMetadata("order_id missing from event metadata".to_string())
            })?;
            let user_id = metadata.user_id.ok_or_else(|| {
                ServiceError::MissingMetadata("user_id missing from event metadata".to_string())
            })?;

            state
                .services
                .orders
                .reconcile_payment(order_id, user_id)
                .await?;
            Ok((StatusCode::OK, "ok"))
        }
        PaymentEventKind::Ignored => {
            info!("Ignoring unrecognized payment event kind");
            Ok((StatusCode::OK, "ignored"))
        }
    }
}
