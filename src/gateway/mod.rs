pub mod stripe;

pub use stripe::{
    CheckoutLineItem, CheckoutSession, CheckoutSessionRequest, PaymentEvent, PaymentEventKind,
    StripeGateway,
};
