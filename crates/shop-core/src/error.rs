//! # Error Types
//!
//! Typed error handling for the storefront backend.
//! Every operation returns `Result<T, ShopError>`; the HTTP layer maps
//! each variant onto a status code with [`ShopError::status_code`].

use std::borrow::Cow;
use thiserror::Error;

/// Message returned to clients in place of internal failure details
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Reasons a bearer identity token was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header, or not of the form `Bearer <token>`
    #[error("Authorization token missing or malformed")]
    MissingOrMalformed,

    /// Token was well formed and signed but its `exp` has passed
    #[error("Token expired")]
    Expired,

    /// Token was issued before the user's sessions were revoked
    #[error("Token revoked")]
    Revoked,

    /// The account behind the token is disabled
    #[error("User account is disabled")]
    UserDisabled,

    /// Any other verification failure (signature, audience, issuer, shape)
    #[error("Invalid token")]
    Invalid(String),
}

impl AuthError {
    /// Internal detail for logs (never sent to clients)
    pub fn detail(&self) -> &str {
        match self {
            AuthError::Invalid(reason) => reason,
            _ => "",
        }
    }
}

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Missing or invalid configuration (credentials, URLs, catalog)
    #[error("{0}")]
    Configuration(String),

    /// Malformed request body or parameters
    #[error("{0}")]
    InvalidRequest(String),

    /// Checkout submitted without any lines
    #[error("Cart items are required.")]
    EmptyCart,

    /// Cart line references a product that is not in the catalog
    #[error("Invalid product: {product_id}")]
    InvalidProduct { product_id: String },

    /// Cart line quantity is not a positive integer
    #[error("Invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: String },

    /// Bearer token missing, malformed or refused by the identity provider
    #[error(transparent)]
    Unauthenticated(#[from] AuthError),

    /// Authenticated, but not allowed to touch this resource
    #[error("Forbidden")]
    Forbidden,

    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Provider refused the request because of its content
    #[error("{message}")]
    ProviderRejected { provider: String, message: String },

    /// Provider failed on its side (5xx, unexpected payload)
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Network/HTTP error communicating with a provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature missing, stale or mismatched, or payload unreadable
    #[error("{0}")]
    WebhookSignature(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::EmptyCart => 400,
            ShopError::InvalidProduct { .. } => 400,
            ShopError::InvalidQuantity { .. } => 400,
            ShopError::Unauthenticated(_) => 401,
            ShopError::Forbidden => 403,
            ShopError::NotFound(_) => 404,
            ShopError::ProviderRejected { .. } => 400,
            ShopError::Provider { .. } => 500,
            ShopError::Network(_) => 500,
            ShopError::WebhookSignature(_) => 400,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Configuration errors keep their text (operators need to see
    /// "Stripe is not configured."); other server-side failures collapse
    /// into [`INTERNAL_ERROR_MESSAGE`].
    pub fn client_message(&self) -> Cow<'_, str> {
        match self {
            ShopError::Provider { .. }
            | ShopError::Network(_)
            | ShopError::Serialization(_)
            | ShopError::Internal(_) => Cow::Borrowed(INTERNAL_ERROR_MESSAGE),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// True when the failure is on our side or a provider's, not the caller's
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Webhook signature error with a reason
    pub fn webhook(reason: impl Into<String>) -> Self {
        ShopError::WebhookSignature(reason.into())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;
