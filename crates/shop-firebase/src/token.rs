//! # ID Token Verification
//!
//! Verifies Firebase ID tokens locally against Google's published
//! signing keys. Keys are cached for the `max-age` the endpoint
//! advertises and refetched when a token names an unknown `kid`.

use crate::config::FirebaseConfig;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use shop_core::{AuthError, DecodedToken, ShopError, ShopResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Default)]
struct SigningKeys {
    keys: HashMap<String, DecodingKey>,
    fresh_until: Option<Instant>,
}

impl SigningKeys {
    fn get(&self, kid: &str) -> Option<DecodingKey> {
        match self.fresh_until {
            Some(until) if Instant::now() < until => self.keys.get(kid).cloned(),
            _ => None,
        }
    }
}

/// `max-age` directive of a `Cache-Control` header
pub fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn invalid(reason: impl Into<String>) -> ShopError {
    AuthError::Invalid(reason.into()).into()
}

pub struct IdTokenVerifier {
    project_id: String,
    issuer: String,
    jwks_url: String,
    client: Client,
    keys: RwLock<SigningKeys>,
}

impl IdTokenVerifier {
    pub fn new(config: &FirebaseConfig) -> ShopResult<Self> {
        let project_id = config.project_id.clone().ok_or_else(|| {
            ShopError::Configuration("Firebase project id is not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            issuer: format!("https://securetoken.google.com/{}", project_id),
            project_id,
            jwks_url: config.jwks_url.clone(),
            client,
            keys: RwLock::new(SigningKeys::default()),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Verify signature, expiry, audience, issuer and subject of an ID token.
    ///
    /// Revocation is not checked here; that needs an account lookup.
    #[instrument(skip(self, token))]
    pub async fn verify(&self, token: &str) -> ShopResult<DecodedToken> {
        let header =
            decode_header(token).map_err(|e| invalid(format!("Malformed token: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(invalid(format!("Unexpected signing algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| invalid("Token header has no kid"))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })?
            .claims;

        let uid = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty() && sub.len() <= MAX_UID_LEN)
            .ok_or_else(|| invalid("Token subject must be 1-128 characters"))?
            .to_string();

        if let Some(auth_time) = claims.get("auth_time").and_then(Value::as_i64) {
            if auth_time > Utc::now().timestamp() {
                return Err(invalid("Token auth_time is in the future"));
            }
        }

        debug!("Verified ID token for {}", uid);
        Ok(DecodedToken::new(uid, claims))
    }

    async fn key_for(&self, kid: &str) -> ShopResult<DecodingKey> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key);
        }

        let mut cache = self.keys.write().await;
        if let Some(key) = cache.get(kid) {
            return Ok(key);
        }

        *cache = self.fetch_keys().await?;
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| invalid(format!("No signing key matches kid {}", kid)))
    }

    async fn fetch_keys(&self) -> ShopResult<SigningKeys> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShopError::Provider {
                provider: "firebase".to_string(),
                message: format!("Signing key fetch failed: HTTP {}", status),
            });
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| ShopError::Serialization(format!("Failed to parse signing keys: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys.into_iter().filter(|k| k.kty == "RSA") {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => warn!("Skipping unusable signing key {}: {}", jwk.kid, e),
            }
        }

        debug!("Loaded {} signing keys, cached for {}s", keys.len(), ttl.as_secs());

        Ok(SigningKeys {
            keys,
            fresh_until: Some(Instant::now() + ttl),
        })
    }
}
