//! # Payment Provider Trait
//!
//! Seam between the checkout pipeline and the hosted payment page vendor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProvider (trait)                    │
//! │  ├── create_checkout_session()                              │
//! │  ├── verify_webhook()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │  StripeCheckout   │
//!                  │  (shop-stripe)    │
//!                  └───────────────────┘
//! ```

use crate::checkout::{CheckoutSession, CheckoutSessionRequest};
use crate::error::ShopResult;
use crate::webhook::WebhookEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// A hosted-checkout payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a hosted checkout session.
    ///
    /// Implementations must fail with `ShopError::Configuration` before
    /// touching the network when their credentials are absent.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> ShopResult<CheckoutSession>;

    /// Authenticate a webhook delivery and parse its event.
    ///
    /// # Arguments
    /// * `payload` - Exact request body bytes as received
    /// * `signature` - Provider signature header
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Shared, dynamically dispatched provider
pub type SharedPaymentProvider = Arc<dyn PaymentProvider>;
