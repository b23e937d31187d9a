//! Shared fixtures for the HTTP tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use serde_json::json;
use shop_api::{create_router, AppConfig, AppState};
use shop_core::{
    AuthError, CheckoutCompletedData, CheckoutService, CheckoutSessionBuilder, DecodedToken,
    IdentityProvider, NewUser, PaymentSucceededData, ProductCatalog, ShopError, ShopResult,
    UserRecord, UserUpdate, WebhookEvent, WebhookHandler,
};
use shop_stripe::{compute_signature, StripeCheckoutProvider, StripeConfig};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const STRIPE_KEY: &str = "sk_test_51storefront";

/// Records which handler each dispatched event reached
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<String>>,
}

impl WebhookHandler for RecordingHandler {
    fn on_checkout_completed(&self, data: CheckoutCompletedData) -> ShopResult<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("completed:{}", data.session_id));
        Ok(())
    }

    fn on_payment_succeeded(&self, data: PaymentSucceededData) -> ShopResult<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("succeeded:{}", data.payment_intent_id));
        Ok(())
    }

    fn on_unhandled(&self, event: &WebhookEvent) -> ShopResult<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("unhandled:{}", event.event_type.as_str()));
        Ok(())
    }
}

/// Identity provider with fixed tokens and one existing account
pub struct FakeIdentity;

pub fn user_record(uid: &str, display_name: Option<&str>) -> UserRecord {
    UserRecord {
        uid: uid.to_string(),
        email: Some(format!("{}@example.com", uid)),
        display_name: display_name.map(String::from),
        disabled: false,
        custom_claims: None,
        tokens_valid_after: DateTime::<Utc>::from_timestamp(0, 0),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_id_token(&self, token: &str) -> ShopResult<DecodedToken> {
        match token {
            "user-1-token" => {
                let claims = json!({
                    "sub": "user_1",
                    "email": "user_1@example.com",
                    "auth_time": 1_700_000_000,
                    "role": "customer"
                });
                Ok(DecodedToken::new(
                    "user_1",
                    claims.as_object().cloned().unwrap_or_default(),
                ))
            }
            "expired-token" => Err(AuthError::Expired.into()),
            "revoked-token" => Err(AuthError::Revoked.into()),
            _ => Err(AuthError::Invalid("signature mismatch".into()).into()),
        }
    }

    async fn create_user(&self, user: &NewUser) -> ShopResult<UserRecord> {
        if user.email == "taken@example.com" {
            return Err(ShopError::ProviderRejected {
                provider: "firebase".into(),
                message: "The email address is already in use by another account.".into(),
            });
        }
        Ok(UserRecord {
            email: Some(user.email.clone()),
            ..user_record("user_new", user.display_name.as_deref())
        })
    }

    async fn get_user(&self, uid: &str) -> ShopResult<UserRecord> {
        match uid {
            "user_1" => Ok(user_record("user_1", Some("Skater"))),
            _ => Err(ShopError::NotFound(
                "There is no user record corresponding to the provided identifier.".into(),
            )),
        }
    }

    async fn update_user(&self, uid: &str, update: &UserUpdate) -> ShopResult<UserRecord> {
        let mut record = self.get_user(uid).await?;
        if let Some(name) = &update.display_name {
            record.display_name = Some(name.clone());
        }
        Ok(record)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub handler: Arc<RecordingHandler>,
}

/// Router with a real Stripe provider pointed at `stripe_base`
pub fn app(stripe_base: &str) -> TestApp {
    app_with_config(stripe_base, AppConfig {
        frontend_url: "https://9thform.com".into(),
        asset_base_url: "https://9thform.com".into(),
        ..Default::default()
    })
}

pub fn app_with_config(stripe_base: &str, config: AppConfig) -> TestApp {
    let stripe =
        StripeConfig::new(Some(STRIPE_KEY), Some(WEBHOOK_SECRET)).with_api_base_url(stripe_base);
    let handler = Arc::new(RecordingHandler::default());

    let checkout = CheckoutService::new(
        Arc::new(ProductCatalog::storefront()),
        CheckoutSessionBuilder::new(config.checkout_urls(), config.checkout_options()),
        Arc::new(StripeCheckoutProvider::new(stripe).unwrap()),
    )
    .with_webhook_handler(handler.clone());

    let state = AppState::new(config, checkout, Arc::new(FakeIdentity));
    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        handler,
    }
}

pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (HeaderName::from_static(name), HeaderValue::from_str(value).unwrap())
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    header("authorization", &format!("Bearer {}", token))
}

/// `Stripe-Signature` value for `payload` signed now
pub fn stripe_signature(payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(WEBHOOK_SECRET, timestamp, payload)
    )
}
