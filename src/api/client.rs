//! HTTP client for the storefront catalog endpoints.
//!
//! Page fetches follow the storefront's failure policy: a network error, a
//! non-2xx status or a `success:false` payload is logged and collapses to an
//! empty page, never a user-visible error. The smaller lookups (brands,
//! counts, single product) surface their errors to the caller instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::api::models::{
    BrandCountsResponse, BrandSummary, PageFetchResult, ProductsResponse,
};
use crate::catalog::normalize_product;
use crate::catalog::product::Product;
use crate::filters::state::{FilterState, SortKey};
use crate::pagination::controller::PAGE_SIZE;
use crate::util::env::{env_opt, env_parse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {0}")]
    Status(StatusCode),
    #[error("upstream reported failure")]
    Failed,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub backfill_cooldown: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            page_size: PAGE_SIZE,
            request_timeout: Duration::from_secs(10),
            backfill_cooldown: Duration::from_secs(1),
        }
    }
}

impl CatalogConfig {
    /// Config via env: CATALOG_API_BASE, CATALOG_PAGE_SIZE,
    /// CATALOG_TIMEOUT_MS, CATALOG_BACKFILL_COOLDOWN_MS.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_opt("CATALOG_API_BASE").unwrap_or(defaults.base_url),
            page_size: env_parse("CATALOG_PAGE_SIZE", defaults.page_size),
            request_timeout: Duration::from_millis(env_parse(
                "CATALOG_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )),
            backfill_cooldown: Duration::from_millis(env_parse(
                "CATALOG_BACKFILL_COOLDOWN_MS",
                defaults.backfill_cooldown.as_millis() as u64,
            )),
        }
    }
}

/// Seam between the pagination glue and the network, so the session can be
/// driven by mocks in tests.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_page(
        &self,
        nomenclature_id: &str,
        filters: &FilterState,
        page: u32,
    ) -> PageFetchResult;
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(CatalogConfig::from_env())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Query pairs for a page fetch. `inStock=true` is always forced
    /// server-side regardless of the in-stock filter's UI state.
    fn page_query(&self, filters: &FilterState, page: u32) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = vec![
            ("limit".into(), self.config.page_size.to_string()),
            ("page".into(), page.to_string()),
            ("inStock".into(), "true".into()),
        ];
        if let Some(min) = filters.min_price {
            query.push(("minPrice".into(), min.to_string()));
        }
        if let Some(max) = filters.max_price {
            query.push(("maxPrice".into(), max.to_string()));
        }
        for brand in &filters.brands {
            query.push(("brand".into(), brand.clone()));
        }
        if !filters.categories.is_empty() {
            query.push(("category".into(), filters.categories.join(",")));
        }
        if filters.sort != SortKey::Default {
            query.push(("sort".into(), filters.sort.as_str().into()));
        }
        query
    }

    async fn fetch_page_inner(
        &self,
        nomenclature_id: &str,
        filters: &FilterState,
        page: u32,
    ) -> Result<PageFetchResult, ClientError> {
        let endpoint = if filters.rost {
            "by-rost-category"
        } else {
            "by-nomenclature"
        };
        let url = format!(
            "{}/api/products/{endpoint}/{nomenclature_id}",
            self.config.base_url
        );
        let response = self
            .http
            .get(&url)
            .query(&self.page_query(filters, page))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let body: ProductsResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::Failed);
        }
        Ok(PageFetchResult::from_response(body))
    }

    /// `GET /api/brands`.
    pub async fn brands(&self) -> Result<Vec<BrandSummary>, ClientError> {
        let url = format!("{}/api/brands", self.config.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// `GET /api/brands/by-nomenclature/{id}`.
    pub async fn brand_counts(
        &self,
        nomenclature_id: &str,
    ) -> Result<BrandCountsResponse, ClientError> {
        let url = format!(
            "{}/api/brands/by-nomenclature/{nomenclature_id}",
            self.config.base_url
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let body: BrandCountsResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::Failed);
        }
        Ok(body)
    }

    /// `GET /api/products/{id}`.
    pub async fn product(&self, id: &str) -> Result<Option<Product>, ClientError> {
        let url = format!("{}/api/products/{id}", self.config.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let raw: serde_json::Value = response.json().await?;
        // Some deployments wrap the product, some return it bare.
        let node = raw.get("product").unwrap_or(&raw);
        Ok(Some(normalize_product(node)))
    }

    /// `GET /api/products?subcategory=&limit=` for the related-products rail,
    /// falling back to a small local list when the endpoint is unavailable.
    pub async fn related_products(&self, subcategory: &str, limit: usize) -> Vec<Product> {
        match self.related_products_inner(subcategory, limit).await {
            Ok(products) if !products.is_empty() => products,
            Ok(_) => fallback_related(),
            Err(err) => {
                error!(%err, subcategory, "related products fetch failed, using local fallback");
                fallback_related()
            }
        }
    }

    async fn related_products_inner(
        &self,
        subcategory: &str,
        limit: usize,
    ) -> Result<Vec<Product>, ClientError> {
        let url = format!("{}/api/products", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("subcategory", subcategory), ("limit", &limit.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let body: ProductsResponse = response.json().await?;
        Ok(body.products.iter().map(normalize_product).collect())
    }
}

#[async_trait]
impl ProductSource for CatalogClient {
    async fn fetch_page(
        &self,
        nomenclature_id: &str,
        filters: &FilterState,
        page: u32,
    ) -> PageFetchResult {
        match self.fetch_page_inner(nomenclature_id, filters, page).await {
            Ok(result) => {
                debug!(
                    nomenclature_id,
                    page,
                    products = result.products.len(),
                    total = result.total,
                    "fetched catalog page"
                );
                result
            }
            Err(err) => {
                // No retry and no error banner: the grid shows the generic
                // "no products found" empty state.
                error!(%err, nomenclature_id, page, "catalog page fetch failed");
                PageFetchResult::empty()
            }
        }
    }
}

/// Minimal stand-in rail shown when the related-products endpoint is down.
fn fallback_related() -> Vec<Product> {
    [
        json!({"id": "fallback-1", "name": "Frigider Arctic AK54305", "pret": 7999,
               "brand": "Arctic", "stoc": 5}),
        json!({"id": "fallback-2", "name": "Masina de spalat Beko WUE6512", "pret": 5499,
               "brand": "Beko", "stoc": 3}),
        json!({"id": "fallback-3", "name": "Televizor Samsung UE43AU7092", "pret": 6299,
               "brand": "Samsung", "stoc": 7}),
        json!({"id": "fallback-4", "name": "Aspirator Samsung VCC4540", "pret": 1899,
               "brand": "Samsung", "stoc": 2}),
    ]
    .iter()
    .map(normalize_product)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_forces_in_stock_and_repeats_brands() {
        let client = CatalogClient::new(CatalogConfig::default()).unwrap();
        let filters = FilterState {
            brands: vec!["b1".into(), "b2".into()],
            min_price: Some(100),
            sort: SortKey::PriceAsc,
            in_stock_only: false,
            ..FilterState::default()
        };
        let query = client.page_query(&filters, 2);
        assert!(query.contains(&("inStock".into(), "true".into())));
        assert!(query.contains(&("page".into(), "2".into())));
        assert!(query.contains(&("limit".into(), "20".into())));
        assert!(query.contains(&("minPrice".into(), "100".into())));
        assert!(query.contains(&("sort".into(), "price-asc".into())));
        let brands: Vec<_> = query.iter().filter(|(k, _)| k == "brand").collect();
        assert_eq!(brands.len(), 2);
    }

    #[test]
    fn fallback_rail_is_never_empty_and_normalized() {
        let rail = fallback_related();
        assert!(!rail.is_empty());
        for product in rail {
            assert!(!product.imagini.is_empty());
            assert!(product.pret > 0);
        }
    }
}
