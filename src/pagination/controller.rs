//! Page loading and backfill control.
//!
//! The controller is a sans-IO state machine: callers ask it for a fetch
//! ticket, perform the request however they like, and feed the outcome back.
//! Every ticket is stamped with a request generation; a completion whose
//! generation is no longer current is dropped, so a response arriving after
//! the user already changed filters can never clobber newer state.
//!
//! Backfill replaces grid slots lost to broken images. It runs one request at
//! a time and, after each completion, waits out a cooldown before the next
//! attempt. The clock is injected (`now` is a parameter everywhere), so the
//! cooldown is testable without real timers.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::api::models::PageFetchResult;
use crate::catalog::product::Product;
use crate::grid::images::BrokenImageTracker;

/// Grid page size; also the backfill target.
pub const PAGE_SIZE: usize = 20;

/// Pause between consecutive backfill fetches.
pub const BACKFILL_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Backfill,
}

/// Stamped handle for one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    page: u32,
    kind: FetchKind,
}

impl FetchTicket {
    /// Page to request from the server.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> FetchKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackfillPhase {
    Idle,
    Fetching,
    Cooldown { until: Instant },
}

#[derive(Debug)]
pub struct PageController {
    page_size: usize,
    cooldown: Duration,
    generation: u64,
    loading: bool,
    products: Vec<Product>,
    total_pages: u32,
    total: u64,
    /// Page shown in the URL/pagination control; never moved by backfill.
    display_page: u32,
    /// Last page actually fetched, including backfill pages.
    cursor: u32,
    backfill: BackfillPhase,
    images: BrokenImageTracker,
}

impl Default for PageController {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl PageController {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            cooldown: BACKFILL_COOLDOWN,
            generation: 0,
            loading: false,
            products: Vec::new(),
            total_pages: 1,
            total: 0,
            display_page: 1,
            cursor: 1,
            backfill: BackfillPhase::Idle,
            images: BrokenImageTracker::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn display_page(&self) -> u32 {
        self.display_page
    }

    pub fn images(&self) -> &BrokenImageTracker {
        &self.images
    }

    /// Start a fresh load for the given user-visible page. Invalidates every
    /// outstanding ticket and clears the broken-image map.
    pub fn begin_load(&mut self, page: u32) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        self.products.clear();
        self.images.reset();
        self.display_page = page.max(1);
        self.cursor = self.display_page;
        self.backfill = BackfillPhase::Idle;
        FetchTicket {
            generation: self.generation,
            page: self.display_page,
            kind: FetchKind::Initial,
        }
    }

    /// Feed back the outcome of an initial load. `None` is a failed fetch and
    /// renders as the empty state.
    pub fn complete_load(&mut self, ticket: FetchTicket, outcome: Option<PageFetchResult>) {
        if ticket.generation != self.generation {
            debug!(page = ticket.page, "dropping stale page response");
            return;
        }
        let result = outcome.unwrap_or_else(PageFetchResult::empty);
        self.products = result.products;
        self.total_pages = result.total_pages;
        self.total = result.total;
        self.loading = false;
    }

    /// Report a failed image load; may flip a product to hidden and in turn
    /// make the grid eligible for backfill.
    pub fn report_broken_image(&mut self, product_id: &str, url: &str) {
        self.images.report_broken(product_id, url);
    }

    fn valid_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| !self.images.is_hidden(p))
    }

    /// Products currently shown: the first `page_size` that still have a
    /// working image.
    pub fn visible(&self) -> Vec<&Product> {
        self.valid_products().take(self.page_size).collect()
    }

    /// Skeleton placeholders padding the grid while a backfill is in flight.
    pub fn skeleton_count(&self) -> usize {
        if self.backfill == BackfillPhase::Fetching {
            self.page_size.saturating_sub(self.visible().len())
        } else {
            0
        }
    }

    fn has_next_page(&self) -> bool {
        self.cursor < self.total_pages
    }

    /// Whether a backfill fetch should be issued now: the initial load is
    /// done, the grid is short of valid-image products, another page exists,
    /// nothing is in flight and any cooldown has expired.
    pub fn needs_backfill(&self, now: Instant) -> bool {
        if self.loading || !self.has_next_page() {
            return false;
        }
        match self.backfill {
            BackfillPhase::Fetching => false,
            BackfillPhase::Cooldown { until } if now < until => false,
            _ => self.valid_products().count() < self.page_size,
        }
    }

    /// Time left before the backfill cooldown expires, if one is running.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        match self.backfill {
            BackfillPhase::Cooldown { until } if now < until => Some(until - now),
            _ => None,
        }
    }

    /// Issue the next sequential backfill fetch, if one is due. The internal
    /// cursor advances; the display page does not.
    pub fn begin_backfill(&mut self, now: Instant) -> Option<FetchTicket> {
        if !self.needs_backfill(now) {
            return None;
        }
        self.cursor += 1;
        self.backfill = BackfillPhase::Fetching;
        debug!(page = self.cursor, "backfilling grid from next page");
        Some(FetchTicket {
            generation: self.generation,
            page: self.cursor,
            kind: FetchKind::Backfill,
        })
    }

    /// Merge a backfill outcome: only products whose id is not already loaded
    /// are appended, and the cooldown starts regardless of outcome. The
    /// broken-image map is deliberately not reset.
    pub fn complete_backfill(
        &mut self,
        ticket: FetchTicket,
        outcome: Option<PageFetchResult>,
        now: Instant,
    ) {
        if ticket.generation != self.generation {
            debug!(page = ticket.page, "dropping stale backfill response");
            return;
        }
        if let Some(result) = outcome {
            let known: HashSet<String> = self.products.iter().map(|p| p.id.clone()).collect();
            self.products
                .extend(result.products.into_iter().filter(|p| !known.contains(&p.id)));
        }
        self.backfill = BackfillPhase::Cooldown {
            until: now + self.cooldown,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::normalize_product;
    use serde_json::json;

    fn page_of(ids: std::ops::Range<u32>, total_pages: u32, total: u64) -> PageFetchResult {
        PageFetchResult {
            products: ids
                .map(|i| {
                    normalize_product(&json!({
                        "id": format!("p{i}"),
                        "pret": 100 + i,
                        "imagini": [format!("/img/{i}.jpg")]
                    }))
                })
                .collect(),
            total_pages,
            total,
            facets: None,
        }
    }

    #[test]
    fn initial_load_populates_the_grid() {
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        assert!(ctrl.is_loading());
        ctrl.complete_load(ticket, Some(page_of(0..20, 5, 95)));
        assert!(!ctrl.is_loading());
        assert_eq!(ctrl.visible().len(), 20);
        assert_eq!(ctrl.total_pages(), 5);
        assert_eq!(ctrl.total(), 95);
        assert!(!ctrl.needs_backfill(Instant::now()));
    }

    #[test]
    fn failed_fetch_renders_the_empty_state() {
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, None);
        assert!(ctrl.visible().is_empty());
        assert_eq!(ctrl.total_pages(), 1);
        assert_eq!(ctrl.total(), 0);
        assert!(!ctrl.needs_backfill(Instant::now()));
    }

    #[test]
    fn empty_success_does_not_trigger_backfill() {
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..0, 1, 0)));
        assert!(ctrl.visible().is_empty());
        assert_eq!(ctrl.total_pages(), 1);
        assert!(!ctrl.needs_backfill(Instant::now()));
    }

    #[test]
    fn broken_images_trigger_exactly_one_backfill() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..20, 3, 55)));

        // Hide two products entirely.
        ctrl.report_broken_image("p0", "/img/0.jpg");
        ctrl.report_broken_image("p1", "/img/1.jpg");
        assert_eq!(ctrl.visible().len(), 18);
        assert!(ctrl.needs_backfill(now));

        let backfill = ctrl.begin_backfill(now).expect("backfill due");
        assert_eq!(backfill.page(), 2);
        // Re-entrancy guard: nothing else starts while one is in flight.
        assert!(ctrl.begin_backfill(now).is_none());
        assert_eq!(ctrl.skeleton_count(), 2);

        ctrl.complete_backfill(backfill, Some(page_of(20..40, 3, 55)), now);
        assert_eq!(ctrl.visible().len(), 20);
        assert_eq!(ctrl.skeleton_count(), 0);
        // Display page never moves with the cursor.
        assert_eq!(ctrl.display_page(), 1);
    }

    #[test]
    fn backfill_cooldown_suppresses_immediate_retry() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..20, 5, 100)));
        ctrl.report_broken_image("p0", "/img/0.jpg");

        let backfill = ctrl.begin_backfill(now).unwrap();
        // The backfill page brought nothing new; the grid is still short.
        ctrl.complete_backfill(backfill, Some(page_of(0..20, 5, 100)), now);
        assert_eq!(ctrl.visible().len(), 19);

        // Within the cooldown: suppressed. After it: allowed.
        assert!(ctrl.begin_backfill(now + Duration::from_millis(500)).is_none());
        let later = now + Duration::from_millis(1100);
        let second = ctrl.begin_backfill(later).expect("cooldown elapsed");
        assert_eq!(second.page(), 3);
    }

    #[test]
    fn backfill_merge_skips_known_ids() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..20, 2, 30)));
        ctrl.report_broken_image("p0", "/img/0.jpg");

        let backfill = ctrl.begin_backfill(now).unwrap();
        // Overlapping window: ids 10..30, of which 10..20 are already loaded.
        ctrl.complete_backfill(backfill, Some(page_of(10..30, 2, 30)), now);
        let visible = ctrl.visible();
        assert_eq!(visible.len(), 20);
        let ids: Vec<&str> = visible.iter().map(|p| p.id.as_str()).collect();
        assert!(!ids.contains(&"p0"));
        assert!(ids.contains(&"p29"));
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 20);
    }

    #[test]
    fn pages_exhausted_stops_backfill() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..10, 1, 10)));
        ctrl.report_broken_image("p0", "/img/0.jpg");
        // Only one page exists: nothing to backfill from.
        assert!(!ctrl.needs_backfill(now));
        assert!(ctrl.begin_backfill(now).is_none());
    }

    #[test]
    fn stale_responses_are_dropped() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let first = ctrl.begin_load(1);
        // User changes filters before the first response lands.
        let second = ctrl.begin_load(1);
        ctrl.complete_load(first, Some(page_of(0..20, 9, 180)));
        assert!(ctrl.is_loading(), "stale response must not finish the load");
        ctrl.complete_load(second, Some(page_of(0..5, 1, 5)));
        assert_eq!(ctrl.visible().len(), 5);
        assert_eq!(ctrl.total_pages(), 1);

        // A backfill ticket from a previous generation is ignored too.
        let third = ctrl.begin_load(1);
        ctrl.complete_load(third, Some(page_of(0..20, 4, 70)));
        ctrl.report_broken_image("p0", "/img/0.jpg");
        let backfill = ctrl.begin_backfill(now).unwrap();
        let fourth = ctrl.begin_load(1);
        ctrl.complete_load(fourth, Some(page_of(0..20, 4, 70)));
        ctrl.complete_backfill(backfill, Some(page_of(20..40, 4, 70)), now);
        assert_eq!(ctrl.products_len_for_tests(), 20);
    }

    #[test]
    fn new_load_resets_broken_images_but_backfill_does_not() {
        let now = Instant::now();
        let mut ctrl = PageController::new(20);
        let ticket = ctrl.begin_load(1);
        ctrl.complete_load(ticket, Some(page_of(0..20, 3, 60)));
        ctrl.report_broken_image("p0", "/img/0.jpg");
        assert_eq!(ctrl.images().broken_count("p0"), 1);

        let backfill = ctrl.begin_backfill(now).unwrap();
        ctrl.complete_backfill(backfill, Some(page_of(20..40, 3, 60)), now);
        assert_eq!(ctrl.images().broken_count("p0"), 1, "backfill keeps reports");

        let ticket = ctrl.begin_load(2);
        ctrl.complete_load(ticket, Some(page_of(20..40, 3, 60)));
        assert_eq!(ctrl.images().broken_count("p0"), 0, "fresh load clears them");
    }

    impl PageController {
        fn products_len_for_tests(&self) -> usize {
            self.products.len()
        }
    }
}
