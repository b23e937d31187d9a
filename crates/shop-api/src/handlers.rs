//! # Request Handlers
//!
//! Axum request handlers for the storefront API.

use crate::error::{ApiJson, ApiResult};
use crate::middleware::RawBody;
use crate::state::AppState;
use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use shop_core::{
    parse_bearer_token, CatalogEntry, CheckoutRequest, CheckoutSession, NewUser, Principal,
    ShopError, UserRecord, UserUpdate, WebhookAck,
};
use tracing::{info, instrument};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Storefront API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Catalog entry plus its formatted price
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing<'a> {
    #[serde(flatten)]
    pub entry: &'a CatalogEntry,
    pub display_price: String,
}

impl<'a> From<&'a CatalogEntry> for ProductListing<'a> {
    fn from(entry: &'a CatalogEntry) -> Self {
        Self {
            display_price: entry.display_price(),
            entry,
        }
    }
}

/// Catalog listing for the shop page
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<ProductListing<'_>> = state
        .catalog()
        .entries()
        .into_iter()
        .map(ProductListing::from)
        .collect();
    Json(json!({
        "products": products,
        "count": products.len()
    }))
}

/// Validate the cart and open a Stripe Checkout session
#[instrument(skip_all)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<Json<CheckoutSession>> {
    let session = state.checkout.create_session(&request).await?;
    Ok(Json(session))
}

/// Stripe webhook endpoint.
///
/// Must be mounted behind [`crate::middleware::capture_raw_body`]; the
/// signature covers the exact bytes Stripe sent.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<WebhookAck>> {
    let RawBody(payload) = request.extensions().get::<RawBody>().cloned().ok_or_else(|| {
        ShopError::Configuration("Missing raw body for Stripe webhook verification.".to_string())
    })?;

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let ack = state.checkout.handle_webhook(&payload, signature).await?;
    Ok(Json(ack))
}

/// Verify the caller's ID token and echo its claims
#[instrument(skip_all)]
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = parse_bearer_token(authorization)?;

    let decoded = state.identity.verify_id_token(token).await?;
    Ok(Json(json!({ "decodedToken": decoded })))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    user.validate()?;

    let record = state.identity.create_user(&user).await?;
    info!("Registered user {}", record.uid);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "uid": record.uid,
            "email": record.email,
            "displayName": record.display_name
        })),
    ))
}

#[instrument(skip_all, fields(uid = %uid))]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(uid): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    principal.ensure_owner(&uid)?;

    let record = state.identity.get_user(&uid).await?;
    Ok(Json(record))
}

#[instrument(skip_all, fields(uid = %uid))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(uid): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult<Json<UserRecord>> {
    principal.ensure_owner(&uid)?;

    let record = state.identity.update_user(&uid, &update).await?;
    info!("Updated profile for {}", uid);
    Ok(Json(record))
}
