use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Served for any product the upstream feeds ship without a usable image.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder-product.png";

/// Which upstream feed produced a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// The primary product feed.
    #[default]
    Local,
    /// The alternate "rost" feed, selected by `type=rost` in the URL.
    Rost,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Local => "local",
            SourceTag::Rost => "rost",
        }
    }
}

/// Subcategory reference carried by every canonical product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
}

impl Default for Subcategory {
    fn default() -> Self {
        Self {
            id: "1".to_string(),
            name: "Electronics".to_string(),
            category_id: "1".to_string(),
            category_name: "Electronics".to_string(),
        }
    }
}

/// Canonical product record, the single shape the grid and cart work with.
///
/// Field names follow the feed's Romanian vocabulary where the feeds do
/// (`pret`, `pretRedus`, `imagini`, `specificatii`, `subcategorie`) so that a
/// canonical product round-trips through the normalizer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub code: String,
    /// List price, rounded up to a whole unit.
    pub pret: i64,
    /// Discounted price; present only when strictly below `pret`.
    #[serde(rename = "pretRedus")]
    pub pret_redus: Option<f64>,
    /// Never empty; falls back to [`PLACEHOLDER_IMAGE`].
    pub imagini: Vec<String>,
    #[serde(rename = "stockQuantity")]
    pub stock_quantity: i64,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    pub description: String,
    /// Always carries a `brand` entry ("Unknown" when the feed has none).
    pub specificatii: IndexMap<String, String>,
    pub subcategorie: Subcategory,
    pub source: SourceTag,
}

impl Product {
    /// Brand as recorded in the specification map.
    pub fn brand(&self) -> &str {
        self.specificatii
            .get("brand")
            .map(String::as_str)
            .unwrap_or("Unknown")
    }

    /// Effective price shown to the customer.
    pub fn effective_price(&self) -> f64 {
        self.pret_redus.unwrap_or(self.pret as f64)
    }

    pub fn has_discount(&self) -> bool {
        self.pret_redus.is_some()
    }
}
