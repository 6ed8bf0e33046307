use crate::{
    entities::{order, order_item, Address, AddressModel, Order, OrderItem, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::{CheckoutLineItem, CheckoutSessionRequest, StripeGateway},
    services::{carts::CartService, pricing},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub user_id: Uuid,
    /// `None` when the request carried no address; rejected as invalid input.
    pub address_id: Option<Uuid>,
    pub items: Vec<OrderItemInput>,
}

/// Outcome of an online placement: either a hosted-checkout redirect or an
/// instantly-settled demo order when no gateway is configured.
#[derive(Debug)]
pub enum OnlinePlacement {
    Redirect { url: String },
    Simulated { order_id: Uuid },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineDetails {
    pub product: ProductModel,
    pub quantity: i32,
}

/// An order with its product and address references expanded.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLineDetails>,
    pub address: AddressModel,
    pub amount: i64,
    pub payment_type: order::PaymentType,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    gateway: Option<Arc<StripeGateway>>,
    carts: CartService,
    currency: String,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        gateway: Option<Arc<StripeGateway>>,
        carts: CartService,
        currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            carts,
            currency,
        }
    }

    fn validate(input: &PlaceOrderInput) -> Result<Uuid, ServiceError> {
        let address_id = input
            .address_id
            .ok_or_else(|| ServiceError::InvalidInput("Address is required".to_string()))?;
        if input.items.is_empty() {
            return Err(ServiceError::InvalidInput("Cart is empty".to_string()));
        }
        if input.items.iter().any(|item| item.quantity <= 0) {
            return Err(ServiceError::InvalidInput(
                "Item quantity must be positive".to_string(),
            ));
        }
        Ok(address_id)
    }

    /// Resolves each item's product record, failing when a reference cannot
    /// be found.
    async fn resolve_lines(
        &self,
        items: &[OrderItemInput],
    ) -> Result<Vec<(ProductModel, i32)>, ServiceError> {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = Product::find_by_id(item.product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
            lines.push((product, item.quantity));
        }
        Ok(lines)
    }

    /// Inserts the order and its items in one transaction.
    async fn insert_order(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        lines: &[(ProductModel, i32)],
        amount: i64,
        payment_type: order::PaymentType,
        is_paid: bool,
    ) -> Result<Uuid, ServiceError> {
        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            address_id: Set(address_id),
            amount: Set(amount),
            payment_type: Set(payment_type),
            is_paid: Set(is_paid),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        for (product, quantity) in lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                quantity: Set(*quantity),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        info!("Created order {} for user {}", order_id, user_id);
        Ok(order_id)
    }

    /// Places a cash-on-delivery order. No gateway interaction; the order is
    /// created unpaid and settles outside the online flow.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn place_cod_order(&self, input: PlaceOrderInput) -> Result<(), ServiceError> {
        let address_id = Self::validate(&input)?;
        let lines = self.resolve_lines(&input.items).await?;
        let amount = pricing::order_total(
            &lines
                .iter()
                .map(|(p, q)| (p.offer_price, *q))
                .collect::<Vec<_>>(),
        );

        self.insert_order(
            input.user_id,
            address_id,
            &lines,
            amount,
            order::PaymentType::Cod,
            false,
        )
        .await?;
        Ok(())
    }

    /// Places an online order. With a gateway configured this creates an
    /// unpaid order and a hosted checkout session; the cart is left alone
    /// until the completion webhook arrives. Without one, the order is
    /// settled immediately as a demo payment and the cart is cleared.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn place_online_order(
        &self,
        input: PlaceOrderInput,
        origin: Option<&str>,
    ) -> Result<OnlinePlacement, ServiceError> {
        let address_id = Self::validate(&input)?;
        let lines = self.resolve_lines(&input.items).await?;
        let amount = pricing::order_total(
            &lines
                .iter()
                .map(|(p, q)| (p.offer_price, *q))
                .collect::<Vec<_>>(),
        );

        let Some(gateway) = self.gateway.clone() else {
            let order_id = self
                .insert_order(
                    input.user_id,
                    address_id,
                    &lines,
                    amount,
                    order::PaymentType::OnlineDemo,
                    true,
                )
                .await?;
            self.event_sender
                .send_or_log(Event::OrderPaid {
                    order_id,
                    user_id: input.user_id,
                })
                .await;
            self.carts.clear(input.user_id).await?;
            return Ok(OnlinePlacement::Simulated { order_id });
        };

        let origin = origin.ok_or_else(|| {
            ServiceError::InvalidInput("Origin header is required for online payment".to_string())
        })?;

        // Order first, session second. A session failure leaves this order
        // unpaid and orphaned; the gateway never learns about it and no
        // compensating cleanup runs.
        let order_id = self
            .insert_order(
                input.user_id,
                address_id,
                &lines,
                amount,
                order::PaymentType::Online,
                false,
            )
            .await?;

        let session = gateway
            .create_checkout_session(CheckoutSessionRequest {
                currency: self.currency.clone(),
                line_items: lines
                    .iter()
                    .map(|(product, quantity)| CheckoutLineItem {
                        name: product.name.clone(),
                        unit_amount: pricing::unit_amount_with_surcharge(product.offer_price),
                        quantity: *quantity,
                    })
                    .collect(),
                success_url: format!("{origin}/order-confirmed?session_id={{CHECKOUT_SESSION_ID}}"),
                cancel_url: format!("{origin}/cart"),
                order_id,
                user_id: input.user_id,
            })
            .await?;

        Ok(OnlinePlacement::Redirect { url: session.url })
    }

    /// Marks an order paid and clears the owner's cart. Safe under
    /// at-least-once webhook delivery: re-marking a paid order and clearing
    /// an empty cart are both no-ops.
    #[instrument(skip(self))]
    pub async fn reconcile_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !existing.is_paid {
            let mut active: order::ActiveModel = existing.into();
            active.is_paid = Set(true);
            active.update(&*self.db).await?;
            self.event_sender
                .send_or_log(Event::OrderPaid { order_id, user_id })
                .await;
            info!("Order {} marked paid", order_id);
        }

        self.carts.clear(user_id).await?;
        Ok(())
    }

    /// All orders belonging to one user, newest first, references expanded.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.expand(orders).await
    }

    /// Every order system-wide, newest first. Access control for this view
    /// is the caller's responsibility.
    pub async fn list_all(&self) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.expand(orders).await
    }

    async fn expand(&self, orders: Vec<order::Model>) -> Result<Vec<OrderDetails>, ServiceError> {
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let address = Address::find_by_id(order.address_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Address {} not found", order.address_id))
                })?;

            let items = OrderItem::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .all(&*self.db)
                .await?;

            let mut lines = Vec::with_capacity(items.len());
            for item in items {
                let product = Product::find_by_id(item.product_id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
                lines.push(OrderLineDetails {
                    product,
                    quantity: item.quantity,
                });
            }

            details.push(OrderDetails {
                id: order.id,
                user_id: order.user_id,
                items: lines,
                address,
                amount: order.amount,
                payment_type: order.payment_type,
                is_paid: order.is_paid,
                created_at: order.created_at,
            });
        }
        Ok(details)
    }
}
