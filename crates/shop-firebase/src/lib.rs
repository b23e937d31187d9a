//! # shop-firebase
//!
//! Firebase Authentication identity provider for the storefront backend.
//!
//! - [`IdTokenVerifier`] checks ID tokens against Google's published keys
//! - [`AccessTokenSource`] exchanges a service-account assertion for an
//!   OAuth2 access token
//! - [`IdentityToolkitClient`] creates, looks up and updates accounts
//! - [`FirebaseAuth`] ties them together behind `shop_core::IdentityProvider`
//!
//! ```rust,ignore
//! let auth = FirebaseAuth::from_env()?;
//! let principal = shop_core::authenticate(header, &auth).await?;
//! ```

pub mod admin;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod token;

#[cfg(test)]
mod test_support;

pub use admin::IdentityToolkitClient;
pub use auth::FirebaseAuth;
pub use config::{resolve_project_id, FirebaseConfig, ServiceAccount};
pub use credentials::AccessTokenSource;
pub use token::IdTokenVerifier;
