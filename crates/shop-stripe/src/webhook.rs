//! # Stripe Webhook Verification
//!
//! Stripe signs every delivery with `Stripe-Signature: t=<unix>,v1=<hex>`,
//! where `v1 = HMAC-SHA256(secret, "<t>." ++ body)`. The HMAC is taken over
//! the exact body bytes, so callers must pass the unparsed request body.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shop_core::{ShopError, ShopResult, WebhookEvent, WebhookEventType};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Events the storefront expects to receive
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] =
    &["checkout.session.completed", "payment_intent.succeeded"];

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    if header.trim().is_empty() {
        return Err(ShopError::webhook("No stripe-signature header value was provided."));
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::webhook("Unable to extract timestamp and signatures from header")
    })?;

    if signatures.is_empty() {
        return Err(ShopError::webhook(
            "No signatures found with expected scheme v1",
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Hex HMAC-SHA256 of `"<timestamp>." ++ payload`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC can take key of any size"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a `Stripe-Signature` header against the raw body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> ShopResult<()> {
    let parsed = parse_signature_header(header)?;

    let expected = compute_signature(secret, parsed.timestamp, payload);
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        return Err(ShopError::webhook(
            "No signatures found matching the expected signature for payload",
        ));
    }

    if (now.timestamp() - parsed.timestamp).abs() > tolerance_secs {
        return Err(ShopError::webhook("Timestamp outside the tolerance zone"));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Verify a delivery and parse it into a [`WebhookEvent`].
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> ShopResult<WebhookEvent> {
    verify_signature(payload, header, secret, tolerance_secs, Utc::now())?;

    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| ShopError::webhook(format!("Failed to parse webhook: {}", e)))?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    Ok(WebhookEvent {
        event_id: event.id,
        event_type: WebhookEventType::from_type(&event.event_type),
        provider: "stripe".to_string(),
        object: event.data.object,
        created: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}
