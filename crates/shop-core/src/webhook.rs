//! # Webhook Events
//!
//! Verified provider callbacks and the router that hands them to a
//! [`WebhookHandler`]. Events are correlated only through ids and the cart
//! summary embedded in their payload; no local state is consulted.

use crate::cart::CartSummary;
use crate::error::{ShopError, ShopResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Event types we route explicitly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// `checkout.session.completed`
    CheckoutSessionCompleted,
    /// `payment_intent.succeeded`
    PaymentIntentSucceeded,
    /// Anything else, kept verbatim
    Other(String),
}

impl WebhookEventType {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => WebhookEventType::CheckoutSessionCompleted,
            "payment_intent.succeeded" => WebhookEventType::PaymentIntentSucceeded,
            other => WebhookEventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::CheckoutSessionCompleted => "checkout.session.completed",
            WebhookEventType::PaymentIntentSucceeded => "payment_intent.succeeded",
            WebhookEventType::Other(other) => other,
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event id from the provider
    pub event_id: String,
    pub event_type: WebhookEventType,
    /// Provider name
    pub provider: String,
    /// The event's data object (session, payment intent, charge, ...)
    pub object: Map<String, Value>,
    pub created: DateTime<Utc>,
}

impl WebhookEvent {
    /// Id of the event's data object
    pub fn object_id(&self) -> Option<&str> {
        str_field(&self.object, "id")
    }
}

fn str_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Parsed `checkout.session.completed` data
#[derive(Debug, Clone)]
pub struct CheckoutCompletedData {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: String,
    /// Cart summary from session metadata, when present and readable
    pub cart: Option<CartSummary>,
    pub discount_code: Option<String>,
}

impl CheckoutCompletedData {
    pub fn from_event(event: &WebhookEvent) -> ShopResult<Self> {
        let obj = &event.object;

        let session_id = str_field(obj, "id")
            .map(String::from)
            .ok_or_else(|| ShopError::webhook("Missing session id"))?;

        let metadata = obj.get("metadata").and_then(Value::as_object);

        let cart = match metadata.and_then(|m| str_field(m, CartSummary::METADATA_KEY)) {
            Some(raw) => match CartSummary::from_metadata(raw) {
                Ok(cart) => Some(cart),
                Err(e) => {
                    warn!("Session {} has unreadable cart metadata: {}", session_id, e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            payment_intent_id: str_field(obj, "payment_intent").map(String::from),
            customer_email: obj
                .get("customer_details")
                .and_then(|cd| cd.get("email"))
                .and_then(Value::as_str)
                .map(String::from),
            amount_total: obj.get("amount_total").and_then(Value::as_i64),
            currency: str_field(obj, "currency").map(String::from),
            payment_status: str_field(obj, "payment_status")
                .unwrap_or("unknown")
                .to_string(),
            discount_code: metadata
                .and_then(|m| str_field(m, "discount_code"))
                .map(String::from),
            cart,
            session_id,
        })
    }

    /// Check if payment was collected
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Parsed `payment_intent.succeeded` data
#[derive(Debug, Clone)]
pub struct PaymentSucceededData {
    pub payment_intent_id: String,
    pub amount_received: Option<i64>,
    pub currency: Option<String>,
}

impl PaymentSucceededData {
    pub fn from_event(event: &WebhookEvent) -> ShopResult<Self> {
        let obj = &event.object;
        Ok(Self {
            payment_intent_id: str_field(obj, "id")
                .map(String::from)
                .ok_or_else(|| ShopError::webhook("Missing payment intent id"))?,
            amount_received: obj.get("amount_received").and_then(Value::as_i64),
            currency: str_field(obj, "currency").map(String::from),
        })
    }
}

/// Webhook event handler.
///
/// Every method has a logging default; override what you need.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed
    fn on_checkout_completed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        info!(
            "Payment successful: session={}, status={}, amount={:?}, lines={}",
            data.session_id,
            data.payment_status,
            data.amount_total,
            data.cart.as_ref().map(|c| c.lines().len()).unwrap_or(0)
        );
        Ok(())
    }

    /// Called when a payment intent succeeds
    fn on_payment_succeeded(&self, data: PaymentSucceededData) -> ShopResult<()> {
        info!("PaymentIntent was successful: {}", data.payment_intent_id);
        Ok(())
    }

    /// Called for event types we do not route
    fn on_unhandled(&self, event: &WebhookEvent) -> ShopResult<()> {
        info!("Unhandled event type {}", event.event_type.as_str());
        Ok(())
    }
}

/// Handler that only logs
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the matching handler method
pub fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> ShopResult<()> {
    match &event.event_type {
        WebhookEventType::CheckoutSessionCompleted => {
            handler.on_checkout_completed(CheckoutCompletedData::from_event(event)?)
        }
        WebhookEventType::PaymentIntentSucceeded => {
            handler.on_payment_succeeded(PaymentSucceededData::from_event(event)?)
        }
        WebhookEventType::Other(_) => handler.on_unhandled(event),
    }
}

/// Acknowledgement body: `{"received": true}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}
