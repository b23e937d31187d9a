//! # Product Catalog
//!
//! Static catalog of purchasable items. Loaded once at startup (from
//! `config/products.toml` or the built-in storefront list) and shared
//! read-only between requests.

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    CAD,
    EUR,
    GBP,
    JPY,
    AUD,
    MXN,
}

impl Currency {
    /// Returns the lowercase ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::CAD => "cad",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::AUD => "aud",
            Currency::MXN => "mxn",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Format an amount in minor units for display (e.g. "$34.99")
    pub fn format_minor(&self, amount: i64) -> String {
        let symbol = match self {
            Currency::USD => "$",
            Currency::CAD => "C$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::AUD => "A$",
            Currency::MXN => "MX$",
        };
        if self.decimal_places() == 0 {
            return format!("{}{}", symbol, amount);
        }
        let sign = if amount < 0 { "-" } else { "" };
        let abs = amount.unsigned_abs();
        format!("{}{}{}.{:02}", sign, symbol, abs / 100, abs % 100)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchasable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable, opaque identifier (e.g. "prod_TRRTgFMRWW7OZS")
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price in minor currency units (cents for USD)
    pub price: i64,

    /// Currency of `price`
    #[serde(default)]
    pub currency: Currency,

    /// Relative asset path or absolute URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            currency,
            image: None,
        }
    }

    /// Builder: set image path or URL
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Price formatted for display
    pub fn display_price(&self) -> String {
        self.currency.format_minor(self.price)
    }
}

/// On-disk catalog shape (`[[products]]` tables)
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<CatalogEntry>,
}

/// Immutable product catalog keyed by product id
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ProductCatalog {
    /// Build a catalog, rejecting duplicate ids and negative prices
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> ShopResult<Self> {
        let mut map = HashMap::new();
        for entry in entries {
            if entry.price < 0 {
                return Err(ShopError::Configuration(format!(
                    "Catalog entry {} has a negative price",
                    entry.id
                )));
            }
            let id = entry.id.clone();
            if map.insert(id.clone(), entry).is_some() {
                return Err(ShopError::Configuration(format!(
                    "Duplicate catalog entry: {}",
                    id
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// The storefront's built-in catalog
    pub fn storefront() -> Self {
        let entries = [
            CatalogEntry::new(
                "prod_TRRTgFMRWW7OZS",
                "Canvas 9thform Skate Hat",
                3499,
                Currency::USD,
            )
            .with_image("/images/skatecap.PNG"),
            CatalogEntry::new(
                "prod_TRRUrKA3MQ9fay",
                "Canvas 9thform Falling Guy Hat",
                3499,
                Currency::USD,
            )
            .with_image("/images/aspect_white.png"),
        ];
        Self {
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// Load catalog from a TOML string
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let file: CatalogFile = toml::from_str(toml_str)
            .map_err(|e| ShopError::Configuration(format!("Invalid catalog: {}", e)))?;
        Self::from_entries(file.products)
    }

    /// Find an entry by id
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// All entries, sorted by id for stable listings
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
