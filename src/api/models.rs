//! Wire DTOs for the consumed catalog endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::catalog::product::Product;

/// Ids arrive as strings from one feed and numbers from the other.
fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `GET /api/products/by-nomenclature/{id}` and
/// `GET /api/products/by-rost-category/{id}` response envelope. Products are
/// left as raw values; the normalizer owns shape differences.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub filters: Option<FacetSet>,
    /// The rost variant carries the brand list at the top level.
    #[serde(default)]
    pub brands: Option<Vec<BrandSummary>>,
}

/// Facets used to populate filter options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSet {
    #[serde(default)]
    pub brands: Vec<BrandSummary>,
    #[serde(default)]
    pub categories: Vec<CategoryFacet>,
    #[serde(default)]
    pub price_range: Option<PriceRangeFacet>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrandSummary {
    #[serde(deserialize_with = "de_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryFacet {
    #[serde(deserialize_with = "de_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeFacet {
    pub min: f64,
    pub max: f64,
}

/// `GET /api/brands/by-nomenclature/{id}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandCountsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub total_brands: u64,
    #[serde(default)]
    pub brand_counts: HashMap<String, u64>,
}

/// One fetched catalog page, already normalized. The page count is capped at
/// [`MAX_TOTAL_PAGES`] regardless of what the server reports.
#[derive(Debug, Clone, Default)]
pub struct PageFetchResult {
    pub products: Vec<Product>,
    pub total_pages: u32,
    pub total: u64,
    pub facets: Option<FacetSet>,
}

/// Hard cap on the page count exposed to the pagination strip.
pub const MAX_TOTAL_PAGES: u32 = 100;

impl PageFetchResult {
    /// Empty result standing in for a failed fetch: the grid renders the
    /// "no products found" state, nothing retries.
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            total_pages: 1,
            total: 0,
            facets: None,
        }
    }

    pub fn from_response(response: ProductsResponse) -> Self {
        let products = response
            .products
            .iter()
            .map(crate::catalog::normalize_product)
            .collect();
        let mut facets = response.filters;
        if let Some(brands) = response.brands {
            facets
                .get_or_insert_with(FacetSet::default)
                .brands
                .extend(brands);
        }
        Self {
            products,
            total_pages: response.total_pages.min(MAX_TOTAL_PAGES).max(1),
            total: response.total,
            facets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn brand_ids_accept_numbers_and_strings() {
        let b: BrandSummary = serde_json::from_value(json!({"id": 7, "name": "Beko"})).unwrap();
        assert_eq!(b.id, "7");
        let b: BrandSummary =
            serde_json::from_value(json!({"id": "beko", "name": "Beko", "code": "BK"})).unwrap();
        assert_eq!(b.id, "beko");
        assert_eq!(b.code.as_deref(), Some("BK"));
    }

    #[test]
    fn total_pages_is_capped_at_one_hundred() {
        let response: ProductsResponse = serde_json::from_value(json!({
            "success": true, "products": [], "totalPages": 4000, "total": 80000
        }))
        .unwrap();
        let page = PageFetchResult::from_response(response);
        assert_eq!(page.total_pages, MAX_TOTAL_PAGES);
    }

    #[test]
    fn rost_top_level_brands_land_in_the_facets() {
        let response: ProductsResponse = serde_json::from_value(json!({
            "success": true,
            "products": [{"id": 1, "pret": 100}],
            "totalPages": 1,
            "total": 1,
            "brands": [{"id": 3, "name": "Arctic"}]
        }))
        .unwrap();
        let page = PageFetchResult::from_response(response);
        assert_eq!(page.facets.unwrap().brands[0].name, "Arctic");
        assert_eq!(page.products[0].pret, 100);
    }
}
