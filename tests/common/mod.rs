#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Extension, Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Database, Set};
use serde_json::Value;
use std::sync::Arc;
use storefront_api::{
    app_router,
    config::AppConfig,
    entities::{address, cart_item, product, user},
    events,
    gateway::StripeGateway,
    handlers::{AppServices, CallerIdentity},
    schema, AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Harness spinning up application state over a throwaway SQLite database.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// App with no gateway configured (demo mode).
    pub async fn new() -> Self {
        Self::with_gateway(None).await
    }

    /// App with the given gateway injected, mirroring startup wiring.
    pub async fn with_gateway(gateway: Option<StripeGateway>) -> Self {
        let db_url = format!(
            "sqlite:///tmp/storefront_test_{}.db?mode=rwc",
            Uuid::new_v4().simple()
        );
        let config = AppConfig::new(db_url.clone(), "127.0.0.1".into(), 0, "test".into());

        let db = Arc::new(
            Database::connect(db_url)
                .await
                .expect("Failed to open test database"),
        );
        schema::ensure_schema(&db)
            .await
            .expect("Failed to create schema");

        let (event_sender, event_task) = events::event_channel(64);
        let gateway = gateway.map(Arc::new);
        let services = AppServices::build(db.clone(), event_sender.clone(), gateway.clone(), &config);

        let state = AppState {
            db,
            config,
            event_sender,
            gateway,
            services,
        };

        Self {
            state,
            _event_task: event_task,
        }
    }

    /// Router with the caller identity extension the auth middleware would
    /// normally provide.
    pub fn router_as(&self, user_id: Uuid) -> Router {
        app_router(self.state.clone()).layer(Extension(CallerIdentity { user_id }))
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    pub async fn seed_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            email: Set(format!("user-{}@example.com", id.simple())),
            name: Set("Test User".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("Failed to seed user");
        id
    }

    pub async fn seed_address(&self, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        address::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            line1: Set("1 Main St".to_string()),
            line2: Set(None),
            city: Set("Springfield".to_string()),
            state: Set("IL".to_string()),
            postal_code: Set("62701".to_string()),
            country: Set("US".to_string()),
            phone: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("Failed to seed address");
        id
    }

    pub async fn seed_product(&self, name: &str, offer_price: i64) -> Uuid {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            offer_price: Set(offer_price),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("Failed to seed product");
        id
    }

    pub async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
        }
        .insert(&*self.state.db)
        .await
        .expect("Failed to seed cart item");
    }
}

/// Sends a JSON POST and returns status + parsed body.
pub async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("origin", "https://shop.example.com")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");

    send(router, request).await
}

/// Sends a GET and returns status + parsed body.
pub async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");

    send(router, request).await
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}
