use crate::{
    entities::{cart_item, CartItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart access for the order flow. Orders consume carts; the only mutation
/// this service performs is the post-payment clear.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Empties the user's cart. Clearing an already-empty cart is a no-op,
    /// which keeps webhook redelivery safe.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            self.event_sender.send_or_log(Event::CartCleared(user_id)).await;
            info!("Cleared cart for user {}", user_id);
        }
        Ok(())
    }
}
