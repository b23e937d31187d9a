//! # Middleware
//!
//! - [`capture_raw_body`]: buffers the exact request bytes for webhook
//!   signature verification
//! - [`require_principal`]: the bearer-token auth gate

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use shop_core::{authenticate, ShopError};
use tracing::{debug, warn};

/// Unparsed request body, as received on the wire
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

/// Buffer the body (up to `webhook_body_limit`) into a [`RawBody`] extension.
pub async fn capture_raw_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let (mut parts, body) = request.into_parts();

    let bytes = to_bytes(body, state.config.webhook_body_limit)
        .await
        .map_err(|e| {
            warn!("Rejected webhook body: {}", e);
            ApiError(ShopError::InvalidRequest(
                "Webhook body is unreadable or too large".to_string(),
            ))
        })?;

    debug!("Captured {} byte webhook body", bytes.len());

    parts.extensions.insert(RawBody(bytes.clone()));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Verify the bearer token and store the [`shop_core::Principal`] in
/// request extensions.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let principal = authenticate(authorization, state.identity.as_ref())
        .await
        .map_err(|e| {
            if let ShopError::Unauthenticated(auth) = &e {
                warn!("Token verification failed: {}", auth.detail());
            }
            e
        })?;

    debug!("Authenticated {}", principal.uid);
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
