//! # Cart Validation
//!
//! Turns untrusted `{productId, quantity}` pairs into priced line items.
//! Validation is all-or-nothing: the first bad line rejects the whole cart.

use crate::catalog::{CatalogEntry, ProductCatalog};
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A cart line as submitted by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    /// Product id; a missing id is treated as the empty string
    #[serde(default, deserialize_with = "lenient_product_id")]
    pub product_id: String,

    /// Raw quantity; checked by [`parse_quantity`]
    #[serde(default)]
    pub quantity: Value,
}

impl CartLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: impl Into<Value>) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: quantity.into(),
        }
    }
}

// Clients sometimes send numeric ids; keep their textual form.
fn lenient_product_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A cart line that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLineItem {
    pub product_id: String,
    pub quantity: u32,
    pub product: CatalogEntry,
}

impl ValidatedLineItem {
    /// Unit price × quantity, in minor units
    pub fn total(&self) -> i64 {
        self.product.price.saturating_mul(i64::from(self.quantity))
    }
}

/// Parse an untrusted quantity.
///
/// Accepts JSON integers and strings holding a plain decimal integer, in
/// `1..=u32::MAX`. Fractions are rejected rather than truncated.
pub fn parse_quantity(value: &Value) -> Option<u32> {
    let quantity = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse::<u64>().ok()?
        }
        _ => return None,
    };
    if quantity == 0 {
        return None;
    }
    u32::try_from(quantity).ok()
}

/// Validate every line against the catalog, preserving order.
pub fn validate_cart(
    catalog: &ProductCatalog,
    lines: &[CartLineRequest],
) -> ShopResult<Vec<ValidatedLineItem>> {
    if lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    let items = lines
        .iter()
        .map(|line| {
            let product = catalog.get(&line.product_id).ok_or_else(|| {
                ShopError::InvalidProduct {
                    product_id: line.product_id.clone(),
                }
            })?;

            let quantity =
                parse_quantity(&line.quantity).ok_or_else(|| ShopError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                })?;

            Ok(ValidatedLineItem {
                product_id: line.product_id.clone(),
                quantity,
                product: product.clone(),
            })
        })
        .collect::<ShopResult<Vec<_>>>()?;

    debug!("Validated cart with {} lines", items.len());
    Ok(items)
}

/// `{productId, quantity}` summary stored in session metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummaryLine {
    pub product_id: String,
    pub quantity: u32,
}

/// Serialized cart carried through the payment provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSummary(pub Vec<CartSummaryLine>);

impl CartSummary {
    /// Metadata key holding the summary
    pub const METADATA_KEY: &'static str = "cart";

    pub fn from_items(items: &[ValidatedLineItem]) -> Self {
        Self(
            items
                .iter()
                .map(|item| CartSummaryLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
        )
    }

    /// JSON string for a metadata value
    pub fn to_metadata(&self) -> ShopResult<String> {
        serde_json::to_string(self).map_err(|e| ShopError::Serialization(e.to_string()))
    }

    /// Decode the metadata value written by [`CartSummary::to_metadata`]
    pub fn from_metadata(value: &str) -> ShopResult<Self> {
        serde_json::from_str(value)
            .map_err(|e| ShopError::Serialization(format!("Invalid cart metadata: {}", e)))
    }

    pub fn lines(&self) -> &[CartSummaryLine] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SKATE_HAT: &str = "prod_TRRTgFMRWW7OZS";
    const FALLING_GUY_HAT: &str = "prod_TRRUrKA3MQ9fay";

    fn catalog() -> ProductCatalog {
        ProductCatalog::storefront()
    }

    #[test]
    fn test_empty_cart_rejected() {
        let result = validate_cart(&catalog(), &[]);
        assert!(matches!(result, Err(ShopError::EmptyCart)));
    }

    #[test]
    fn test_valid_cart_preserves_order() {
        let lines = vec![
            CartLineRequest::new(FALLING_GUY_HAT, 1),
            CartLineRequest::new(SKATE_HAT, 100),
            CartLineRequest::new(FALLING_GUY_HAT, "3"),
        ];

        let items = validate_cart(&catalog(), &lines).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].product_id, FALLING_GUY_HAT);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].product_id, SKATE_HAT);
        assert_eq!(items[1].quantity, 100);
        assert_eq!(items[1].product.name, "Canvas 9thform Skate Hat");
        assert_eq!(items[2].quantity, 3);
    }

    #[test]
    fn test_unknown_product_rejects_whole_cart() {
        let lines = vec![
            CartLineRequest::new(SKATE_HAT, 1),
            CartLineRequest::new("prod_does_not_exist", 1),
            CartLineRequest::new(FALLING_GUY_HAT, 1),
        ];

        match validate_cart(&catalog(), &lines) {
            Err(ShopError::InvalidProduct { product_id }) => {
                assert_eq!(product_id, "prod_does_not_exist")
            }
            other => panic!("expected InvalidProduct, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_quantities_name_the_product() {
        for bad in [
            json!(0),
            json!(-1),
            json!("abc"),
            json!(1.5),
            json!("1.5"),
            json!(null),
            json!(true),
            json!([2]),
        ] {
            let lines = vec![CartLineRequest::new(SKATE_HAT, bad.clone())];
            match validate_cart(&catalog(), &lines) {
                Err(ShopError::InvalidQuantity { product_id }) => {
                    assert_eq!(product_id, SKATE_HAT, "quantity {}", bad)
                }
                other => panic!("quantity {} should fail, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_product_checked_before_quantity() {
        let lines = vec![CartLineRequest::new("prod_unknown", 0)];
        assert!(matches!(
            validate_cart(&catalog(), &lines),
            Err(ShopError::InvalidProduct { .. })
        ));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!(1)), Some(1));
        assert_eq!(parse_quantity(&json!(100)), Some(100));
        assert_eq!(parse_quantity(&json!(" 7 ")), Some(7));
        assert_eq!(parse_quantity(&json!(0)), None);
        assert_eq!(parse_quantity(&json!(-1)), None);
        assert_eq!(parse_quantity(&json!("-1")), None);
        assert_eq!(parse_quantity(&json!("+2")), None);
        assert_eq!(parse_quantity(&json!(2.0)), None);
        assert_eq!(parse_quantity(&json!(u64::from(u32::MAX) + 1)), None);
    }

    #[test]
    fn test_missing_fields_deserialize_to_invalid_values() {
        let line: CartLineRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(line.product_id, "");
        assert!(line.quantity.is_null());

        let line: CartLineRequest =
            serde_json::from_value(json!({"productId": 42, "quantity": 2})).unwrap();
        assert_eq!(line.product_id, "42");
    }

    #[test]
    fn test_cart_summary_metadata() {
        let items = validate_cart(&catalog(), &[CartLineRequest::new(SKATE_HAT, 2)]).unwrap();
        let summary = CartSummary::from_items(&items);
        let encoded = summary.to_metadata().unwrap();

        assert_eq!(encoded, r#"[{"productId":"prod_TRRTgFMRWW7OZS","quantity":2}]"#);
        assert_eq!(CartSummary::from_metadata(&encoded).unwrap(), summary);
        assert_eq!(items[0].total(), 6998);
    }
}
