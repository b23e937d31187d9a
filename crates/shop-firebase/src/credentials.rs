//! # Service Account Credentials
//!
//! OAuth2 access tokens for Google admin APIs, obtained with an RS256
//! JWT-bearer assertion signed by the service account key.

use crate::config::ServiceAccount;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shop_core::{ShopError, ShopResult};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error};

const SCOPES: &str = concat!(
    "https://www.googleapis.com/auth/cloud-platform ",
    "https://www.googleapis.com/auth/identitytoolkit"
);
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct AccessTokenSource {
    client_email: String,
    key: EncodingKey,
    token_uri: String,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(
        account: &ServiceAccount,
        token_uri: impl Into<String>,
        client: Client,
    ) -> ShopResult<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(|e| {
            ShopError::Configuration(format!("Invalid service account private key: {}", e))
        })?;

        Ok(Self {
            client_email: account.client_email.clone(),
            key,
            token_uri: token_uri.into(),
            client,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self) -> ShopResult<String> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| ShopError::Internal(format!("Failed to sign assertion: {}", e)))
    }

    /// A bearer token valid for at least another minute
    pub async fn access_token(&self) -> ShopResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let assertion = self.assertion()?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("OAuth token exchange failed: status={}, body={}", status, body);
            return Err(ShopError::Provider {
                provider: "firebase".to_string(),
                message: format!("OAuth token exchange failed: HTTP {}", status),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse OAuth token response: {}", e))
        })?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!("Obtained access token for {}, valid {}s", self.client_email, token.expires_in);

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
