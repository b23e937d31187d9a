//! # shop-core
//!
//! Core types and traits for the storefront checkout backend.
//!
//! This crate provides:
//! - `ProductCatalog` and `CatalogEntry` for the static product list
//! - `validate_cart` for all-or-nothing cart validation
//! - `CheckoutSessionBuilder` and `CheckoutSessionRequest` for hosted checkout
//! - `PaymentProvider` trait for payment vendors
//! - `WebhookHandler` and `dispatch_webhook_event` for verified callbacks
//! - `IdentityProvider`, `Principal` and `authenticate` for the auth gate
//! - `CheckoutService`, the pipeline wired together
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CheckoutRequest, CheckoutService, CheckoutSessionBuilder, ProductCatalog};
//!
//! let service = CheckoutService::new(
//!     Arc::new(ProductCatalog::storefront()),
//!     CheckoutSessionBuilder::default(),
//!     Arc::new(stripe),
//! );
//!
//! let session = service.create_session(&request).await?;
//! // Redirect the buyer to session.url
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod env;
pub mod error;
pub mod identity;
pub mod provider;
pub mod service;
pub mod webhook;

// Re-exports for convenience
pub use cart::{
    parse_quantity, validate_cart, CartLineRequest, CartSummary, CartSummaryLine,
    ValidatedLineItem,
};
pub use catalog::{CatalogEntry, Currency, ProductCatalog};
pub use checkout::{
    CheckoutLineItem, CheckoutOptions, CheckoutRequest, CheckoutSession, CheckoutSessionBuilder,
    CheckoutSessionRequest, CheckoutUrls,
};
pub use error::{AuthError, ShopError, ShopResult, INTERNAL_ERROR_MESSAGE};
pub use identity::{
    authenticate, parse_bearer_token, DecodedToken, IdentityProvider, NewUser, Principal,
    SharedIdentityProvider, UserRecord, UserUpdate,
};
pub use provider::{PaymentProvider, SharedPaymentProvider};
pub use service::CheckoutService;
pub use webhook::{
    dispatch_webhook_event, CheckoutCompletedData, LoggingWebhookHandler, PaymentSucceededData,
    WebhookAck, WebhookEvent, WebhookEventType, WebhookHandler,
};
