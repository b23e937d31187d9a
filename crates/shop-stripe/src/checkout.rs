//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API.
//! This is the storefront's only payment flow: the buyer is redirected to
//! Stripe's hosted page and fulfilment is driven by the webhook.

use crate::config::StripeConfig;
use crate::webhook::construct_event;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    CheckoutSession, CheckoutSessionRequest, PaymentProvider, ShopError, ShopResult, WebhookEvent,
};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe Checkout Session provider
///
/// Uses Stripe's hosted checkout page for secure payments.
pub struct StripeCheckoutProvider {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutProvider {
    /// Create a new Stripe checkout provider
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

/// Flatten a session request into Stripe's bracketed form encoding
pub fn session_form_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form_params: Vec<(String, String)> = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        form_params.push((
            format!("line_items[{}][price_data][currency]", i),
            item.currency.as_str().to_string(),
        ));
        form_params.push((
            format!("line_items[{}][price_data][unit_amount]", i),
            item.unit_amount.to_string(),
        ));
        form_params.push((
            format!("line_items[{}][price_data][product_data][name]", i),
            item.name.clone(),
        ));
        if let Some(ref image) = item.image_url {
            form_params.push((
                format!("line_items[{}][price_data][product_data][images][0]", i),
                image.clone(),
            ));
        }
        form_params.push((
            format!("line_items[{}][quantity]", i),
            item.quantity.to_string(),
        ));
    }

    let options = &request.options;
    for (j, country) in options.allowed_countries.iter().enumerate() {
        form_params.push((
            format!("shipping_address_collection[allowed_countries][{}]", j),
            country.clone(),
        ));
    }
    if options.collect_phone_number {
        form_params.push(("phone_number_collection[enabled]".to_string(), "true".to_string()));
    }
    if options.automatic_tax {
        form_params.push(("automatic_tax[enabled]".to_string(), "true".to_string()));
    }
    if options.allow_promotion_codes {
        form_params.push(("allow_promotion_codes".to_string(), "true".to_string()));
    }

    for (key, value) in &request.metadata {
        form_params.push((format!("metadata[{}]", key), value.clone()));
    }

    form_params
}

#[async_trait]
impl PaymentProvider for StripeCheckoutProvider {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> ShopResult<CheckoutSession> {
        let auth_header = self
            .config
            .auth_header()
            .ok_or_else(|| ShopError::Configuration("Stripe is not configured.".to_string()))?;

        let form_params = session_form_params(request);

        debug!(
            "Creating Stripe checkout session: {} line items, {} params",
            request.line_items.len(),
            form_params.len()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));

            return Err(if status.is_client_error() {
                ShopError::ProviderRejected {
                    provider: PROVIDER.to_string(),
                    message,
                }
            } else {
                ShopError::Provider {
                    provider: PROVIDER.to_string(),
                    message,
                }
            });
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!(
            "Created Stripe checkout session: id={}, url={:?}",
            session.id, session.url
        );

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        let secret = self.config.webhook_secret.as_deref().ok_or_else(|| {
            ShopError::Configuration("Stripe webhook secret is not configured.".to_string())
        })?;

        construct_event(payload, signature, secret, self.config.webhook_tolerance_secs)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::compute_signature;
    use chrono::Utc;
    use serde_json::json;
    use shop_core::{
        validate_cart, CartLineRequest, CheckoutOptions, CheckoutSessionBuilder, CheckoutUrls,
        ProductCatalog, WebhookEventType,
    };
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_request(discount: Option<&str>) -> CheckoutSessionRequest {
        let catalog = ProductCatalog::storefront();
        let items = validate_cart(
            &catalog,
            &[
                CartLineRequest::new("prod_TRRTgFMRWW7OZS", 2),
                CartLineRequest::new("prod_TRRUrKA3MQ9fay", 1),
            ],
        )
        .unwrap();
        CheckoutSessionBuilder::new(
            CheckoutUrls::new("https://9thform.com"),
            CheckoutOptions::default(),
        )
        .build(&items, None, None, discount)
        .unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    async fn provider_for(server: &MockServer, key: Option<&str>) -> StripeCheckoutProvider {
        let config = StripeConfig::new(key, Some("whsec_test")).with_api_base_url(server.uri());
        StripeCheckoutProvider::new(config).unwrap()
    }

    #[test]
    fn test_form_params() {
        let request = session_request(Some("SUMMER"));
        let params = session_form_params(&request);

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "payment_method_types[0]"), Some("card"));
        assert_eq!(param(&params, "success_url"), Some("https://9thform.com/thank-you"));
        assert_eq!(
            param(&params, "cancel_url"),
            Some("https://9thform.com/shop?status=cancelled")
        );

        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("3499"));
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][name]"),
            Some("Canvas 9thform Skate Hat")
        );
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][images][0]"),
            Some("https://9thform.com/images/skatecap.PNG")
        );
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(param(&params, "line_items[1][quantity]"), Some("1"));

        assert_eq!(param(&params, "shipping_address_collection[allowed_countries][0]"), Some("US"));
        assert_eq!(param(&params, "shipping_address_collection[allowed_countries][1]"), Some("CA"));
        assert_eq!(param(&params, "phone_number_collection[enabled]"), Some("true"));
        assert_eq!(param(&params, "automatic_tax[enabled]"), Some("true"));
        assert_eq!(param(&params, "allow_promotion_codes"), Some("true"));
        assert_eq!(param(&params, "metadata[discount_code]"), Some("SUMMER"));

        let cart = param(&params, "metadata[cart]").unwrap();
        let cart: serde_json::Value = serde_json::from_str(cart).unwrap();
        assert_eq!(
            cart,
            json!([
                {"productId": "prod_TRRTgFMRWW7OZS", "quantity": 2},
                {"productId": "prod_TRRUrKA3MQ9fay", "quantity": 1}
            ])
        );
    }

    #[test]
    fn test_disabled_options_are_omitted() {
        let mut request = session_request(None);
        request.options = CheckoutOptions {
            allowed_countries: vec![],
            automatic_tax: false,
            allow_promotion_codes: false,
            collect_phone_number: false,
        };
        let params = session_form_params(&request);

        assert!(param(&params, "automatic_tax[enabled]").is_none());
        assert!(param(&params, "allow_promotion_codes").is_none());
        assert!(param(&params, "phone_number_collection[enabled]").is_none());
        assert!(param(&params, "metadata[discount_code]").is_none());
        assert!(!params.iter().any(|(k, _)| k.starts_with("shipping_address_collection")));
    }

    #[tokio::test]
    async fn test_create_session_success() {
        let server = MockServer::start().await;
        let request = session_request(None);

        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_123"))
            .and(header("Idempotency-Key", request.idempotency_key.as_str()))
            .and(header_exists("Stripe-Version"))
            .and(body_string_contains("mode=payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_abc",
                "url": "https://checkout.stripe.com/c/pay/cs_test_abc",
                "object": "checkout.session"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("sk_test_123")).await;
        let session = provider.create_checkout_session(&request).await.unwrap();

        assert_eq!(session.session_id, "cs_test_abc");
        assert_eq!(
            session.url.as_deref(),
            Some("https://checkout.stripe.com/c/pay/cs_test_abc")
        );
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider_for(&server, None).await;
        let err = provider
            .create_checkout_session(&session_request(None))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Stripe is not configured.");
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_stripe_rejection_passes_message_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "message": "Invalid URL: An explicit scheme must be provided."
                }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("sk_test_123")).await;
        let err = provider
            .create_checkout_session(&session_request(None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.client_message(),
            "Invalid URL: An explicit scheme must be provided."
        );
    }

    #[tokio::test]
    async fn test_stripe_outage_does_not_leak() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("sk_test_123")).await;
        let err = provider
            .create_checkout_session(&session_request(None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), shop_core::INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_verify_webhook() {
        let provider =
            StripeCheckoutProvider::new(StripeConfig::new(None, Some("whsec_test"))).unwrap();
        let body = json!({
            "id": "evt_9",
            "type": "payment_intent.succeeded",
            "created": 1_700_000_000,
            "data": {"object": {"id": "pi_1", "amount": 3499}}
        })
        .to_string();
        let ts = Utc::now().timestamp();
        let signature = compute_signature("whsec_test", ts, body.as_bytes());
        let header = format!("t={},v1={}", ts, signature);

        let event = provider.verify_webhook(body.as_bytes(), &header).await.unwrap();
        assert_eq!(event.event_type, WebhookEventType::PaymentIntentSucceeded);
        assert_eq!(event.provider, "stripe");

        let mut tampered = body.into_bytes();
        tampered.push(b' ');
        let err = provider.verify_webhook(&tampered, &header).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_webhook_without_secret_is_configuration_error() {
        let provider =
            StripeCheckoutProvider::new(StripeConfig::new(Some("sk_test_1"), None)).unwrap();
        let err = provider.verify_webhook(b"{}", "t=1,v1=abc").await.unwrap_err();

        assert!(matches!(err, ShopError::Configuration(_)));
        assert_eq!(err.client_message(), "Stripe webhook secret is not configured.");
    }
}
