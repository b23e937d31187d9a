//! # Identity
//!
//! Bearer-token authentication and the identity provider seam. Token
//! verification itself (signature, expiry, revocation) belongs to the
//! provider; this module owns header parsing and the principal shape.

use crate::error::{AuthError, ShopError, ShopResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// All claims of a verified identity token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedToken {
    /// Stable user id (`sub`)
    pub uid: String,
    /// Every claim in the token
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl DecodedToken {
    pub fn new(uid: impl Into<String>, mut claims: Map<String, Value>) -> Self {
        claims.remove("uid");
        Self {
            uid: uid.into(),
            claims,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.get("email").and_then(Value::as_str)
    }

    /// `auth_time` claim, when present
    pub fn auth_time(&self) -> Option<i64> {
        self.claims.get("auth_time").and_then(Value::as_i64)
    }
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining claims (provider claims and custom claims)
    pub claims: Map<String, Value>,
}

impl Principal {
    /// Fails with `Forbidden` unless the principal is `uid`
    pub fn ensure_owner(&self, uid: &str) -> ShopResult<()> {
        if self.uid == uid {
            Ok(())
        } else {
            Err(ShopError::Forbidden)
        }
    }
}

impl From<DecodedToken> for Principal {
    fn from(token: DecodedToken) -> Self {
        let DecodedToken { uid, mut claims } = token;
        let email = match claims.remove("email") {
            Some(Value::String(email)) => Some(email),
            _ => None,
        };
        Self { uid, email, claims }
    }
}

/// An account as stored by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub disabled: bool,
    pub custom_claims: Option<Map<String, Value>>,
    /// Tokens issued before this instant are revoked
    #[serde(skip_serializing)]
    pub tokens_valid_after: Option<DateTime<Utc>>,
}

/// Registration body: `{email, password, displayName?}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> ShopResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ShopError::InvalidRequest(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Profile update body; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default, rename = "photoURL", alias = "photoUrl")]
    pub photo_url: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == UserUpdate::default()
    }
}

/// Identity provider (token verification and account admin).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an identity token, including the revocation check.
    ///
    /// Token problems surface as `ShopError::Unauthenticated`; provider
    /// outages surface as other variants.
    async fn verify_id_token(&self, token: &str) -> ShopResult<DecodedToken>;

    async fn create_user(&self, user: &NewUser) -> ShopResult<UserRecord>;

    /// Fails with `ShopError::NotFound` for unknown users
    async fn get_user(&self, uid: &str) -> ShopResult<UserRecord>;

    async fn update_user(&self, uid: &str, update: &UserUpdate) -> ShopResult<UserRecord>;
}

/// Shared, dynamically dispatched identity provider
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

/// Extract the token from `Bearer <token>` (scheme is case-insensitive).
pub fn parse_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim_start).ok_or(AuthError::MissingOrMalformed)?;
    let (scheme, rest) = header
        .split_once(char::is_whitespace)
        .ok_or(AuthError::MissingOrMalformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingOrMalformed);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthError::MissingOrMalformed);
    }
    Ok(token)
}

/// Authenticate an `Authorization` header value.
pub async fn authenticate(
    authorization: Option<&str>,
    provider: &dyn IdentityProvider,
) -> ShopResult<Principal> {
    let token = parse_bearer_token(authorization)?;
    let decoded = provider.verify_id_token(token).await?;
    Ok(Principal::from(decoded))
}
