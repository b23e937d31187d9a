//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables. Both secrets are
//! optional at startup: checkout and webhooks report "not configured"
//! per request instead of refusing to boot.

use shop_core::env::{secret_from_env, trim_base_url, var_or};
use shop_core::ShopError;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-12-18.acacia";

/// Default tolerance for webhook timestamps (5 minutes)
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: Option<String>,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Max age of a webhook signature timestamp, in seconds
    pub webhook_tolerance_secs: i64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_WEBHOOK_SECRET`
    /// - `STRIPE_API_BASE` (defaults to the public API)
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            secret_key: secret_from_env(&["STRIPE_SECRET_KEY"]),
            webhook_secret: secret_from_env(&["STRIPE_WEBHOOK_SECRET"]),
            api_base_url: trim_base_url(&var_or("STRIPE_API_BASE", DEFAULT_API_BASE_URL)),
            api_version: DEFAULT_API_VERSION.to_string(),
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: Option<&str>, webhook_secret: Option<&str>) -> Self {
        Self {
            secret_key: secret_key.map(String::from),
            webhook_secret: webhook_secret.map(String::from),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
        }
    }

    /// Check key formats of whichever secrets are present
    pub fn validate(&self) -> Result<(), ShopError> {
        if let Some(key) = &self.secret_key {
            if !key.starts_with("sk_test_") && !key.starts_with("sk_live_") {
                return Err(ShopError::Configuration(
                    "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
                ));
            }
        }

        if let Some(secret) = &self.webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(ShopError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key
            .as_deref()
            .is_some_and(|k| k.starts_with("sk_test_"))
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key
            .as_deref()
            .is_some_and(|k| k.starts_with("sk_live_"))
    }

    /// Get authorization header value, if a secret key is configured
    pub fn auth_header(&self) -> Option<String> {
        self.secret_key.as_ref().map(|key| format!("Bearer {}", key))
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.api_base_url = trim_base_url(url.as_ref());
        self
    }
}
