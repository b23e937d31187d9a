//! # Firebase Authentication
//!
//! [`FirebaseAuth`] is the storefront's [`IdentityProvider`]: local ID
//! token verification plus, when a service account is configured, the
//! revocation check and account admin calls.

use crate::admin::IdentityToolkitClient;
use crate::config::FirebaseConfig;
use crate::credentials::AccessTokenSource;
use crate::token::IdTokenVerifier;
use async_trait::async_trait;
use reqwest::Client;
use shop_core::{
    AuthError, DecodedToken, IdentityProvider, NewUser, ShopError, ShopResult, UserRecord,
    UserUpdate,
};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FirebaseAuth {
    verifier: Option<IdTokenVerifier>,
    admin: Option<IdentityToolkitClient>,
}

impl FirebaseAuth {
    /// Build from config. Missing pieces degrade per call rather than
    /// failing startup: no project id means every token is a
    /// configuration error, no service account means no admin calls.
    pub fn new(config: &FirebaseConfig) -> ShopResult<Self> {
        let verifier = match config.project_id {
            Some(_) => Some(IdTokenVerifier::new(config)?),
            None => {
                warn!("Firebase project id is not configured; token verification disabled");
                None
            }
        };

        let admin = match (&config.project_id, &config.service_account) {
            (Some(project_id), Some(account)) => {
                let client = Client::builder()
                    .timeout(REQUEST_TIMEOUT)
                    .build()
                    .map_err(|e| {
                        ShopError::Configuration(format!("Failed to create HTTP client: {}", e))
                    })?;
                let tokens =
                    AccessTokenSource::new(account, config.token_uri.clone(), client.clone())?;
                info!("Firebase admin enabled for {}", account.client_email);
                Some(IdentityToolkitClient::new(
                    &config.identity_toolkit_url,
                    project_id,
                    tokens,
                    client,
                ))
            }
            _ => None,
        };

        Ok(Self { verifier, admin })
    }

    pub fn from_env() -> ShopResult<Self> {
        Self::new(&FirebaseConfig::from_env())
    }

    pub fn has_admin(&self) -> bool {
        self.admin.is_some()
    }

    fn verifier(&self) -> ShopResult<&IdTokenVerifier> {
        self.verifier.as_ref().ok_or_else(|| {
            ShopError::Configuration("Firebase project id is not configured".to_string())
        })
    }

    fn admin(&self) -> ShopResult<&IdentityToolkitClient> {
        self.admin.as_ref().ok_or_else(|| {
            ShopError::Configuration("Firebase service account is not configured".to_string())
        })
    }

    /// Reject tokens of disabled users and tokens issued before a revocation
    async fn check_revoked(
        &self,
        admin: &IdentityToolkitClient,
        token: &DecodedToken,
    ) -> ShopResult<()> {
        let user = admin.get_user(&token.uid).await.map_err(|e| match e {
            ShopError::NotFound(_) => {
                ShopError::from(AuthError::Invalid("User not found".to_string()))
            }
            other => other,
        })?;

        if user.disabled {
            return Err(AuthError::UserDisabled.into());
        }

        if let (Some(valid_after), Some(auth_time)) = (user.tokens_valid_after, token.auth_time()) {
            if auth_time < valid_after.timestamp() {
                return Err(AuthError::Revoked.into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    #[instrument(skip(self, token))]
    async fn verify_id_token(&self, token: &str) -> ShopResult<DecodedToken> {
        let decoded = self.verifier()?.verify(token).await?;

        match &self.admin {
            Some(admin) => self.check_revoked(admin, &decoded).await?,
            None => debug!("Revocation check skipped: no service account configured"),
        }

        Ok(decoded)
    }

    async fn create_user(&self, user: &NewUser) -> ShopResult<UserRecord> {
        self.admin()?.create_user(user).await
    }

    async fn get_user(&self, uid: &str) -> ShopResult<UserRecord> {
        self.admin()?.get_user(uid).await
    }

    async fn update_user(&self, uid: &str, update: &UserUpdate) -> ShopResult<UserRecord> {
        self.admin()?.update_user(uid, update).await
    }
}
