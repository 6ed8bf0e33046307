pub mod common;
pub mod orders;
pub mod payment_webhooks;

use crate::{
    config::AppConfig,
    events::EventSender,
    gateway::StripeGateway,
    services::{carts::CartService, orders::OrderService},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of the authenticated caller, supplied by the surrounding auth
/// middleware as a request extension. This crate does not authenticate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

/// Service registry shared through AppState.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        gateway: Option<Arc<StripeGateway>>,
        config: &AppConfig,
    ) -> Self {
        let carts = CartService::new(db.clone(), event_sender.clone());
        let orders = OrderService::new(
            db,
            event_sender,
            gateway,
            carts.clone(),
            config.currency.clone(),
        );
        Self {
            orders: Arc::new(orders),
            carts: Arc::new(carts),
        }
    }
}
