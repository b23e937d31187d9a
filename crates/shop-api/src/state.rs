//! # Application State
//!
//! Shared state for the Axum application: built once at startup and
//! handed to every handler through `State`.

use anyhow::Context;
use shop_core::env::{split_list, trim_base_url, var_or};
use shop_core::{
    CheckoutOptions, CheckoutService, CheckoutSessionBuilder, CheckoutUrls, ProductCatalog,
    SharedIdentityProvider,
};
use shop_firebase::FirebaseAuth;
use shop_stripe::{StripeCheckoutProvider, StripeConfig, REQUIRED_WEBHOOK_EVENTS};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_WEBHOOK_BODY_LIMIT: usize = 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Storefront origin for checkout redirects
    pub frontend_url: String,
    /// Base for relative product image paths
    pub asset_base_url: String,
    /// Shipping allow-list (ISO country codes)
    pub allowed_countries: Vec<String>,
    /// Explicit catalog file, overriding the search path
    pub catalog_path: Option<String>,
    /// Max bytes buffered for a webhook delivery
    pub webhook_body_limit: usize,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let frontend_url = trim_base_url(&var_or("FRONTEND_URL", DEFAULT_FRONTEND_URL));
        let asset_base_url = std::env::var("ASSET_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| trim_base_url(&v))
            .unwrap_or_else(|| frontend_url.clone());

        Self {
            host: var_or("HOST", "127.0.0.1"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: var_or("ENVIRONMENT", "development"),
            frontend_url,
            asset_base_url,
            allowed_countries: std::env::var("SHIPPING_COUNTRIES")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            catalog_path: std::env::var("CATALOG_PATH").ok().filter(|v| !v.trim().is_empty()),
            webhook_body_limit: std::env::var("WEBHOOK_BODY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WEBHOOK_BODY_LIMIT),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls::new(&self.frontend_url).with_asset_base_url(&self.asset_base_url)
    }

    /// Checkout options; an empty allow-list keeps the default countries
    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions::default().with_allowed_countries(self.allowed_countries.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let frontend_url = DEFAULT_FRONTEND_URL.to_string();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            asset_base_url: frontend_url.clone(),
            frontend_url,
            allowed_countries: Vec::new(),
            catalog_path: None,
            webhook_body_limit: DEFAULT_WEBHOOK_BODY_LIMIT,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Catalog, session builder and payment provider
    pub checkout: Arc<CheckoutService>,
    pub identity: SharedIdentityProvider,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        checkout: CheckoutService,
        identity: SharedIdentityProvider,
    ) -> Self {
        Self {
            config: Arc::new(config),
            checkout: Arc::new(checkout),
            identity,
        }
    }

    /// Wire Stripe and Firebase from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let catalog = load_product_catalog(config.catalog_path.as_deref())?;

        let stripe = StripeCheckoutProvider::from_env().context("Failed to initialize Stripe")?;
        log_stripe_setup(&config, stripe.config());

        let firebase = FirebaseAuth::from_env().context("Failed to initialize Firebase")?;

        let checkout = CheckoutService::new(
            Arc::new(catalog),
            CheckoutSessionBuilder::new(config.checkout_urls(), config.checkout_options()),
            Arc::new(stripe),
        );

        Ok(Self::new(config, checkout, Arc::new(firebase)))
    }

    pub fn catalog(&self) -> &ProductCatalog {
        self.checkout.catalog()
    }
}

fn log_stripe_setup(config: &AppConfig, stripe: &StripeConfig) {
    if stripe.secret_key.is_none() {
        warn!("STRIPE_SECRET_KEY is not set; checkout will fail until it is");
    } else if stripe.is_live_mode() && !config.is_production() {
        warn!("Live Stripe key in {} environment", config.environment);
    } else if stripe.is_test_mode() {
        info!("Stripe mode: test");
    } else {
        info!("Stripe mode: live");
    }

    if stripe.webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be refused");
    } else {
        info!(
            "Stripe webhook endpoint must send: {}",
            REQUIRED_WEBHOOK_EVENTS.join(", ")
        );
    }
}

/// Load the product catalog.
///
/// An explicit path must exist. Otherwise `config/products.toml` is looked
/// up from the working directory and its parents, falling back to the
/// built-in storefront catalog.
pub fn load_product_catalog(explicit: Option<&str>) -> anyhow::Result<ProductCatalog> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path))?;
        let catalog = ProductCatalog::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", path))?;
        info!("Loaded {} products from {}", catalog.len(), path);
        return Ok(catalog);
    }

    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .with_context(|| format!("Failed to parse {}", path))?;
            info!("Loaded {} products from {}", catalog.len(), path);
            return Ok(catalog);
        }
    }

    info!("No product catalog file found, using built-in storefront catalog");
    Ok(ProductCatalog::storefront())
}
