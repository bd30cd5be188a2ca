//! Per-product broken-image bookkeeping.
//!
//! The grid reports every failed image load here. A product stays visible as
//! long as at least one of its images has not failed; once every image is
//! known broken the product is hidden and the pagination controller may
//! backfill the grid from the next page. The map is cleared on every fresh
//! filter/page fetch but survives backfill merges, so failures discovered
//! while backfilling accumulate within one logical view.

use std::collections::{HashMap, HashSet};

use crate::catalog::product::{Product, PLACEHOLDER_IMAGE};

#[derive(Debug, Default, Clone)]
pub struct BrokenImageTracker {
    broken: HashMap<String, HashSet<String>>,
}

impl BrokenImageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed image load for a product.
    pub fn report_broken(&mut self, product_id: &str, url: &str) {
        self.broken
            .entry(product_id.to_string())
            .or_default()
            .insert(url.to_string());
    }

    /// First image of the product not known to be broken, or the placeholder
    /// when every image has failed.
    pub fn valid_image_for<'a>(&self, product: &'a Product) -> &'a str {
        let broken = self.broken.get(&product.id);
        product
            .imagini
            .iter()
            .find(|url| broken.map_or(true, |set| !set.contains(*url)))
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// A product is hidden once all of its known images have failed.
    pub fn is_hidden(&self, product: &Product) -> bool {
        self.broken
            .get(&product.id)
            .map_or(false, |set| set.len() >= product.imagini.len())
    }

    pub fn broken_count(&self, product_id: &str) -> usize {
        self.broken.get(product_id).map_or(0, HashSet::len)
    }

    /// Forget everything; called on every fresh filter/page fetch.
    pub fn reset(&mut self) {
        self.broken.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::normalize_product;
    use serde_json::json;

    fn product(id: &str, images: &[&str]) -> Product {
        normalize_product(&json!({"id": id, "pret": 100, "imagini": images}))
    }

    #[test]
    fn valid_image_skips_broken_urls() {
        let p = product("p1", &["/a.jpg", "/b.jpg"]);
        let mut tracker = BrokenImageTracker::new();
        assert_eq!(tracker.valid_image_for(&p), "/a.jpg");

        tracker.report_broken("p1", "/a.jpg");
        assert_eq!(tracker.valid_image_for(&p), "/b.jpg");
        assert!(!tracker.is_hidden(&p));
    }

    #[test]
    fn product_hides_once_every_image_failed() {
        let p = product("p1", &["/a.jpg", "/b.jpg"]);
        let mut tracker = BrokenImageTracker::new();
        tracker.report_broken("p1", "/a.jpg");
        tracker.report_broken("p1", "/b.jpg");
        assert!(tracker.is_hidden(&p));
        assert_eq!(tracker.valid_image_for(&p), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn duplicate_reports_count_once() {
        let p = product("p1", &["/a.jpg", "/b.jpg"]);
        let mut tracker = BrokenImageTracker::new();
        tracker.report_broken("p1", "/a.jpg");
        tracker.report_broken("p1", "/a.jpg");
        assert_eq!(tracker.broken_count("p1"), 1);
        assert!(!tracker.is_hidden(&p));
    }

    #[test]
    fn reset_clears_all_reports() {
        let p = product("p1", &["/a.jpg"]);
        let mut tracker = BrokenImageTracker::new();
        tracker.report_broken("p1", "/a.jpg");
        assert!(tracker.is_hidden(&p));
        tracker.reset();
        assert!(!tracker.is_hidden(&p));
        assert_eq!(tracker.valid_image_for(&p), "/a.jpg");
    }
}
