//! # shop-api
//!
//! HTTP API layer for the storefront checkout backend.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout and catalog endpoints
//! - Stripe webhook ingress with raw-body capture
//! - Firebase-backed account endpoints behind a bearer-token gate
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/`, `/health` | Health check |
//! | GET | `/products` | List products |
//! | POST | `/stripe/create-checkout-session` | Create checkout session |
//! | POST | `/stripe/webhook` | Stripe webhook |
//! | POST | `/auth/verify` | Verify ID token |
//! | POST | `/auth/register` | Register account |
//! | GET | `/auth/user/{uid}` | Read own profile |
//! | PUT | `/auth/user/{uid}` | Update own profile |

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiJson, ApiResult};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
