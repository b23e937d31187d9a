//! # Identity Toolkit Admin
//!
//! Account administration over the Identity Toolkit REST API
//! (`/v1/projects/{project}/accounts`), authorized as the service account.

use crate::credentials::AccessTokenSource;
use chrono::DateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shop_core::{NewUser, ShopError, ShopResult, UserRecord, UserUpdate};
use tracing::{error, info, instrument, warn};

const PROVIDER: &str = "firebase";
const USER_NOT_FOUND: &str = "There is no user record corresponding to the provided identifier.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<ToolkitUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolkitUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
    /// JSON object encoded as a string
    #[serde(default)]
    custom_attributes: Option<String>,
    /// Unix seconds, encoded as a string
    #[serde(default)]
    valid_since: Option<String>,
}

impl From<ToolkitUser> for UserRecord {
    fn from(user: ToolkitUser) -> Self {
        let custom_claims = user.custom_attributes.as_deref().and_then(|raw| {
            match serde_json::from_str::<Map<String, Value>>(raw) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    warn!("Ignoring unreadable custom claims for {}: {}", user.local_id, e);
                    None
                }
            }
        });

        let tokens_valid_after = user
            .valid_since
            .as_deref()
            .and_then(|secs| secs.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        UserRecord {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            disabled: user.disabled,
            custom_claims,
            tokens_valid_after,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorResponse {
    error: ToolkitErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorDetail {
    message: String,
}

/// Map an Identity Toolkit error code to the message clients see
fn toolkit_error(status: reqwest::StatusCode, code: &str) -> ShopError {
    // Codes may carry a detail suffix: "WEAK_PASSWORD : Password should be at least 6 characters"
    let key = code.split(':').next().unwrap_or(code).trim();

    let message = match key {
        "USER_NOT_FOUND" => return ShopError::NotFound(USER_NOT_FOUND.to_string()),
        "EMAIL_EXISTS" => "The email address is already in use by another account.",
        "INVALID_EMAIL" => "The email address is improperly formatted.",
        "WEAK_PASSWORD" => "The password must be a string with at least 6 characters.",
        "PHONE_NUMBER_EXISTS" => "The user with the provided phone number already exists.",
        "INVALID_PHONE_NUMBER" => "The phone number must be a non-empty E.164 standards compliant identifier string.",
        _ => code,
    };

    if status.is_client_error() {
        ShopError::ProviderRejected {
            provider: PROVIDER.to_string(),
            message: message.to_string(),
        }
    } else {
        ShopError::Provider {
            provider: PROVIDER.to_string(),
            message: message.to_string(),
        }
    }
}

pub struct IdentityToolkitClient {
    accounts_url: String,
    tokens: AccessTokenSource,
    client: Client,
}

impl IdentityToolkitClient {
    pub fn new(
        base_url: &str,
        project_id: &str,
        tokens: AccessTokenSource,
        client: Client,
    ) -> Self {
        Self {
            accounts_url: format!("{}/v1/projects/{}/accounts", base_url, project_id),
            tokens,
            client,
        }
    }

    async fn call<B, R>(&self, action: &str, body: &B) -> ShopResult<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let url = format!("{}{}", self.accounts_url, action);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ToolkitErrorResponse>(&text) {
                Ok(parsed) => toolkit_error(status, &parsed.error.message),
                Err(_) => {
                    error!("Identity Toolkit error: status={}, body={}", status, text);
                    ShopError::Provider {
                        provider: PROVIDER.to_string(),
                        message: format!("HTTP {}", status),
                    }
                }
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Identity Toolkit response: {}", e))
        })
    }

    #[instrument(skip(self, user))]
    pub async fn create_user(&self, user: &NewUser) -> ShopResult<UserRecord> {
        let created: AccountResponse = self
            .call(
                "",
                &SignUpRequest {
                    email: &user.email,
                    password: &user.password,
                    display_name: user.display_name.as_deref(),
                },
            )
            .await?;

        info!("Created user {}", created.local_id);
        self.get_user(&created.local_id).await
    }

    pub async fn get_user(&self, uid: &str) -> ShopResult<UserRecord> {
        let lookup: LookupResponse = self
            .call(":lookup", &serde_json::json!({ "localId": [uid] }))
            .await?;

        lookup
            .users
            .into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| ShopError::NotFound(USER_NOT_FOUND.to_string()))
    }

    #[instrument(skip(self, update))]
    pub async fn update_user(&self, uid: &str, update: &UserUpdate) -> ShopResult<UserRecord> {
        if !update.is_empty() {
            let _: AccountResponse = self
                .call(
                    ":update",
                    &UpdateRequest {
                        local_id: uid,
                        email: update.email.as_deref(),
                        password: update.password.as_deref(),
                        display_name: update.display_name.as_deref(),
                        phone_number: update.phone_number.as_deref(),
                        photo_url: update.photo_url.as_deref(),
                    },
                )
                .await?;
            info!("Updated user {}", uid);
        }

        self.get_user(uid).await
    }
}
