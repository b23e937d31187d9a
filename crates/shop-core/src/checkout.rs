//! # Checkout Sessions
//!
//! Provider-agnostic description of a hosted checkout session, built from
//! a validated cart. Providers (see `shop-stripe`) encode it for their API.

use crate::cart::{CartLineRequest, CartSummary, ValidatedLineItem};
use crate::catalog::Currency;
use crate::env::trim_base_url;
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Checkout request body: `{items, successUrl?, cancelUrl?, discountCode?}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Frontend and asset base URLs used to fill redirect and image URLs
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Storefront base URL (e.g. "https://9thform.com")
    pub frontend_url: String,
    /// Base for relative image paths; usually the storefront itself
    pub asset_base_url: String,
}

impl CheckoutUrls {
    pub const SUCCESS_PATH: &'static str = "/thank-you";
    pub const CANCEL_PATH: &'static str = "/shop?status=cancelled";

    pub fn new(frontend_url: impl AsRef<str>) -> Self {
        let frontend_url = trim_base_url(frontend_url.as_ref());
        Self {
            asset_base_url: frontend_url.clone(),
            frontend_url,
        }
    }

    /// Builder: serve images from a different base
    pub fn with_asset_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.asset_base_url = trim_base_url(url.as_ref());
        self
    }

    pub fn success_url(&self) -> String {
        format!("{}{}", self.frontend_url, Self::SUCCESS_PATH)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.frontend_url, Self::CANCEL_PATH)
    }

    /// Absolute URLs pass through; relative paths are joined to the asset base.
    pub fn absolute_image_url(&self, image: &str) -> Option<String> {
        if image.is_empty() {
            return None;
        }
        if is_absolute_http_url(image) {
            return Some(image.to_string());
        }
        let path = image.strip_prefix('/').unwrap_or(image);
        Some(format!("{}/{}", self.asset_base_url, path))
    }
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

fn is_absolute_http_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Session settings that are the same for every checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// ISO 3166-1 alpha-2 countries we ship to
    pub allowed_countries: Vec<String>,
    pub automatic_tax: bool,
    pub allow_promotion_codes: bool,
    pub collect_phone_number: bool,
}

impl CheckoutOptions {
    pub fn with_allowed_countries(mut self, countries: Vec<String>) -> Self {
        if !countries.is_empty() {
            self.allowed_countries = countries
                .into_iter()
                .map(|c| c.to_ascii_uppercase())
                .collect();
        }
        self
    }
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
            automatic_tax: true,
            allow_promotion_codes: true,
            collect_phone_number: true,
        }
    }
}

/// One priced line of a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLineItem {
    pub product_id: String,
    pub name: String,
    /// Unit price in minor units
    pub unit_amount: i64,
    pub currency: Currency,
    pub quantity: u32,
    /// Absolute image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CheckoutLineItem {
    pub fn total(&self) -> i64 {
        self.unit_amount.saturating_mul(i64::from(self.quantity))
    }
}

/// Everything a provider needs to open a hosted checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    #[serde(skip)]
    pub options: CheckoutOptions,
    /// Passed through to the provider and echoed back in webhooks
    pub metadata: BTreeMap<String, String>,
    /// Sent as the provider's idempotency key
    pub idempotency_key: String,
}

impl CheckoutSessionRequest {
    /// Metadata key for a buyer-supplied discount code
    pub const DISCOUNT_CODE_KEY: &'static str = "discount_code";

    /// Sum of all line totals, in minor units
    pub fn total(&self) -> i64 {
        self.line_items
            .iter()
            .map(CheckoutLineItem::total)
            .fold(0, i64::saturating_add)
    }

    /// Units across all lines; each line may hold up to `u32::MAX`
    pub fn item_count(&self) -> u64 {
        self.line_items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Decode the cart summary stored in metadata
    pub fn cart_summary(&self) -> ShopResult<CartSummary> {
        let raw = self
            .metadata
            .get(CartSummary::METADATA_KEY)
            .ok_or_else(|| ShopError::Internal("Checkout request has no cart metadata".into()))?;
        CartSummary::from_metadata(raw)
    }
}

/// Builds [`CheckoutSessionRequest`]s from validated carts
#[derive(Debug, Clone, Default)]
pub struct CheckoutSessionBuilder {
    urls: CheckoutUrls,
    options: CheckoutOptions,
}

impl CheckoutSessionBuilder {
    pub fn new(urls: CheckoutUrls, options: CheckoutOptions) -> Self {
        Self { urls, options }
    }

    pub fn urls(&self) -> &CheckoutUrls {
        &self.urls
    }

    pub fn options(&self) -> &CheckoutOptions {
        &self.options
    }

    /// Build a session request; omitted or blank URLs fall back to the storefront defaults.
    pub fn build(
        &self,
        items: &[ValidatedLineItem],
        success_url: Option<&str>,
        cancel_url: Option<&str>,
        discount_code: Option<&str>,
    ) -> ShopResult<CheckoutSessionRequest> {
        if items.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let line_items = items
            .iter()
            .map(|item| CheckoutLineItem {
                product_id: item.product_id.clone(),
                name: item.product.name.clone(),
                unit_amount: item.product.price,
                currency: item.product.currency,
                quantity: item.quantity,
                image_url: item
                    .product
                    .image
                    .as_deref()
                    .and_then(|image| self.urls.absolute_image_url(image)),
            })
            .collect();

        let mut metadata = BTreeMap::new();
        metadata.insert(
            CartSummary::METADATA_KEY.to_string(),
            CartSummary::from_items(items).to_metadata()?,
        );

        let discount_code = non_blank(discount_code).map(String::from);
        if let Some(code) = &discount_code {
            metadata.insert(CheckoutSessionRequest::DISCOUNT_CODE_KEY.to_string(), code.clone());
        }

        Ok(CheckoutSessionRequest {
            line_items,
            success_url: non_blank(success_url)
                .map(String::from)
                .unwrap_or_else(|| self.urls.success_url()),
            cancel_url: non_blank(cancel_url)
                .map(String::from)
                .unwrap_or_else(|| self.urls.cancel_url()),
            discount_code,
            options: self.options.clone(),
            metadata,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A checkout session opened by a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Provider's session id
    pub session_id: String,
    /// Hosted payment page to redirect the buyer to
    pub url: Option<String>,
}
