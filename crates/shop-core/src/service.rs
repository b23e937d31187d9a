//! # Checkout Service
//!
//! The checkout pipeline as one explicitly constructed object:
//! cart validation → session building → provider call, plus webhook
//! verification → event routing. Built once at startup and shared.

use crate::cart::{validate_cart, ValidatedLineItem};
use crate::catalog::ProductCatalog;
use crate::checkout::{CheckoutRequest, CheckoutSession, CheckoutSessionBuilder};
use crate::error::{ShopError, ShopResult};
use crate::provider::SharedPaymentProvider;
use crate::webhook::{dispatch_webhook_event, LoggingWebhookHandler, WebhookAck, WebhookHandler};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct CheckoutService {
    catalog: Arc<ProductCatalog>,
    builder: CheckoutSessionBuilder,
    provider: SharedPaymentProvider,
    webhook_handler: Arc<dyn WebhookHandler>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        builder: CheckoutSessionBuilder,
        provider: SharedPaymentProvider,
    ) -> Self {
        Self {
            catalog,
            builder,
            provider,
            webhook_handler: Arc::new(LoggingWebhookHandler),
        }
    }

    /// Builder: replace the logging webhook handler
    pub fn with_webhook_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.webhook_handler = handler;
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Validate a submitted cart against the catalog
    pub fn validate(&self, request: &CheckoutRequest) -> ShopResult<Vec<ValidatedLineItem>> {
        validate_cart(&self.catalog, &request.items)
    }

    /// Validate the cart and open a hosted checkout session.
    ///
    /// No provider call is made unless every line validates.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_session(&self, request: &CheckoutRequest) -> ShopResult<CheckoutSession> {
        let items = self.validate(request)?;

        let session_request = self.builder.build(
            &items,
            request.success_url.as_deref(),
            request.cancel_url.as_deref(),
            request.discount_code.as_deref(),
        )?;

        info!(
            "Creating checkout: {} items, total={}, provider={}",
            session_request.item_count(),
            session_request.total(),
            self.provider.provider_name()
        );

        let session = self
            .provider
            .create_checkout_session(&session_request)
            .await
            .map_err(|e| {
                error!("{} checkout error: {}", self.provider.provider_name(), e);
                e
            })?;

        info!("Created checkout session: {}", session.session_id);
        Ok(session)
    }

    /// Verify a webhook delivery and route it.
    ///
    /// Once the signature checks out the delivery is always acknowledged;
    /// handler failures are logged, not returned.
    #[instrument(skip(self, raw_body, signature))]
    pub async fn handle_webhook(&self, raw_body: &[u8], signature: &str) -> ShopResult<WebhookAck> {
        let event = self
            .provider
            .verify_webhook(raw_body, signature)
            .await
            .map_err(|e| {
                match &e {
                    ShopError::WebhookSignature(reason) => {
                        warn!("Webhook signature verification failed: {}", reason)
                    }
                    other => error!("Webhook verification error: {}", other),
                }
                e
            })?;

        info!(
            "Received webhook: type={}, id={}",
            event.event_type.as_str(),
            event.event_id
        );

        if let Err(e) = dispatch_webhook_event(self.webhook_handler.as_ref(), &event) {
            error!(
                "Webhook handler error for {} ({}): {}",
                event.event_id,
                event.event_type.as_str(),
                e
            );
        }

        Ok(WebhookAck::received())
    }
}
