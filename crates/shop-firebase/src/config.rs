//! # Firebase Configuration
//!
//! Project id and service-account credentials, resolved from the same
//! environment variables the Firebase tooling sets.

use serde::Deserialize;
use shop_core::env::{secret_from_env, trim_base_url};
use tracing::warn;

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

const PRIVATE_KEY_VARS: &[&str] = &["SERVICE_ACCOUNT_PRIVATE_KEY", "FIREBASE_PRIVATE_KEY"];

/// Service account used for admin calls and the revocation check
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub service_account: Option<ServiceAccount>,
    /// Published signing keys for ID tokens
    pub jwks_url: String,
    /// OAuth2 token endpoint for service-account assertions
    pub token_uri: String,
    pub identity_toolkit_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig {
    project_id: Option<String>,
}

/// First non-empty of `FIREBASE_PROJECT_ID`, `FIREBASE_CONFIG.projectId`,
/// `GOOGLE_CLOUD_PROJECT`, `GCLOUD_PROJECT`
pub fn resolve_project_id(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    if let Some(id) = non_empty(lookup("FIREBASE_PROJECT_ID")) {
        return Some(id);
    }

    if let Some(raw) = non_empty(lookup("FIREBASE_CONFIG")) {
        match serde_json::from_str::<RuntimeConfig>(&raw) {
            Ok(runtime) => {
                if let Some(id) = non_empty(runtime.project_id) {
                    return Some(id);
                }
            }
            Err(e) => warn!("Failed to parse FIREBASE_CONFIG, falling back to env vars: {}", e),
        }
    }

    non_empty(lookup("GOOGLE_CLOUD_PROJECT")).or_else(|| non_empty(lookup("GCLOUD_PROJECT")))
}

/// Restore newlines in a private key stored with literal `\n` escapes
pub fn normalize_private_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("\\n", "\n")
}

impl FirebaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Admin calls are enabled only when a project id, a private key and
    /// `FIREBASE_CLIENT_EMAIL` are all present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let project_id = resolve_project_id(|name| std::env::var(name).ok());

        let service_account = match (
            secret_from_env(PRIVATE_KEY_VARS),
            secret_from_env(&["FIREBASE_CLIENT_EMAIL"]),
        ) {
            (Some(key), Some(client_email)) if project_id.is_some() => Some(ServiceAccount {
                client_email,
                private_key: normalize_private_key(&key),
            }),
            _ => None,
        };

        Self {
            project_id,
            service_account,
            ..Self::default()
        }
    }

    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    pub fn with_service_account(
        mut self,
        client_email: impl Into<String>,
        private_key: &str,
    ) -> Self {
        self.service_account = Some(ServiceAccount {
            client_email: client_email.into(),
            private_key: normalize_private_key(private_key),
        });
        self
    }

    /// Builder: point every Google endpoint at one base URL (for testing)
    pub fn with_base_url(mut self, base: impl AsRef<str>) -> Self {
        let base = trim_base_url(base.as_ref());
        self.jwks_url = format!("{}/jwks", base);
        self.token_uri = format!("{}/token", base);
        self.identity_toolkit_url = base;
        self
    }

    /// `https://securetoken.google.com/<project id>`
    pub fn issuer(&self) -> Option<String> {
        self.project_id
            .as_ref()
            .map(|id| format!("https://securetoken.google.com/{}", id))
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            service_account: None,
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            identity_toolkit_url: DEFAULT_IDENTITY_TOOLKIT_URL.to_string(),
        }
    }
}
