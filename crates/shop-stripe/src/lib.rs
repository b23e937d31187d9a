//! # shop-stripe
//!
//! Stripe payment provider for the storefront backend.
//!
//! **StripeCheckoutProvider** opens Checkout Sessions with dynamic
//! `price_data` line items built from the catalog, and verifies
//! `Stripe-Signature` headers on webhook deliveries.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeCheckoutProvider;
//! use shop_core::PaymentProvider;
//!
//! let stripe = StripeCheckoutProvider::from_env()?;
//! let session = stripe.create_checkout_session(&request).await?;
//!
//! // Redirect the buyer to session.url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! // `payload` must be the raw request body, byte for byte
//! let event = stripe.verify_webhook(&payload, signature_header).await?;
//! dispatch_webhook_event(&LoggingWebhookHandler, &event)?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::{session_form_params, StripeCheckoutProvider};
pub use config::{StripeConfig, DEFAULT_WEBHOOK_TOLERANCE_SECS};
pub use webhook::{compute_signature, construct_event, verify_signature, REQUIRED_WEBHOOK_EVENTS};
