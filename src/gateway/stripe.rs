use crate::config::AppConfig;
use crate::errors::ServiceError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Client for the hosted-checkout gateway. Constructed once at startup when
/// a credential is configured and injected as an optional capability; when
/// absent, online orders take the demo path and webhooks are acknowledged
/// without processing.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: Option<String>,
    tolerance_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Per-unit charge in the smallest currency unit.
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub currency: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Carried as session metadata so the completion webhook can be
    /// reconciled back to the stored order.
    pub order_id: Uuid,
    pub user_id: Uuid,
}

/// Gateway-hosted checkout session. Ephemeral; never persisted locally.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Recognized payment event kinds. Everything the gateway may send that we
/// do not act on falls into the `Ignored` arm and is acknowledged as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentEventKind {
    #[serde(rename = "checkout.session.completed")]
    CheckoutSessionCompleted,
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded,
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub kind: PaymentEventKind,
    #[serde(default)]
    pub data: EventPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub metadata: EventMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventMetadata {
    pub order_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl StripeGateway {
    pub fn new(secret_key: String, webhook_secret: Option<String>, tolerance_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key,
            webhook_secret,
            tolerance_secs,
        }
    }

    /// Overrides the gateway endpoint, e.g. to target a local stub.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Builds a gateway from configuration; `None` when no credential is set.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.stripe_secret_key.as_ref().map(|key| {
            Self::new(
                key.clone(),
                config.stripe_webhook_secret.clone(),
                config.stripe_webhook_tolerance_secs,
            )
        })
    }

    pub fn verification_enabled(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Requests a hosted checkout session. The caller's order must already
    /// exist; the session carries its id in metadata for the webhook.
    pub async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), request.success_url),
            ("cancel_url".into(), request.cancel_url),
            ("metadata[order_id]".into(), request.order_id.to_string()),
            ("metadata[user_id]".into(), request.user_id.to_string()),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                request.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "checkout session creation rejected");
            return Err(ServiceError::ExternalServiceError(format!(
                "checkout session creation failed with status {status}: {body}"
            )));
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway response: {e}")))
    }

    /// Verifies a `t=<ts>,v1=<hex>` signature header over `"{t}.{body}"`.
    pub fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), ServiceError> {
        let secret = self.webhook_secret.as_ref().ok_or_else(|| {
            ServiceError::InternalError("webhook secret not configured".to_string())
        })?;

        let mut timestamp = "";
        let mut signature = "";
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value,
                Some(("v1", value)) => signature = value,
                _ => {}
            }
        }

        if timestamp.is_empty() || signature.is_empty() {
            return Err(ServiceError::InvalidSignature(
                "malformed signature header".to_string(),
            ));
        }

        let ts: i64 = timestamp.parse().map_err(|_| {
            ServiceError::InvalidSignature("non-numeric signature timestamp".to_string())
        })?;
        let now = chrono::Utc::now().timestamp();
        if (now - ts).unsigned_abs() > self.tolerance_secs {
            return Err(ServiceError::InvalidSignature(
                "signature timestamp outside tolerance".to_string(),
            ));
        }

        let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("hmac init: {e}")))?;
        mac.update(signed.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !constant_time_eq(&expected, signature) {
            return Err(ServiceError::InvalidSignature(
                "signature mismatch".to_string(),
            ));
        }
        Ok(())
    }

    /// Verifies the signature and parses the raw body into a payment event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, ServiceError> {
        self.verify_signature(payload, signature_header)?;
        serde_json::from_slice(payload)
            .map_err(|e| ServiceError::InvalidInput(format!("malformed event payload: {e}")))
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
