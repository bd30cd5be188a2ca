//! Catalog browsing session: the glue between the filter store, the
//! pagination controller and a product source.
//!
//! One session corresponds to one mounted subcategory page. Filter events go
//! through [`FilterStore`]; committed changes refetch the grid and return the
//! replace-navigation for the host to apply after the state commit (no
//! zero-delay timer tricks). The backfill loop keeps fetching sequential
//! pages, honoring the controller's cooldown, until the grid is full or the
//! pages run out.

use std::time::Instant;

use tracing::{debug, info};

use crate::api::client::ProductSource;
use crate::api::models::FacetSet;
use crate::filters::draft::{DismissBehavior, DraftSession};
use crate::filters::state::{
    BrandSelectionMode, FilterAction, FilterEvent, FilterState, FilterStore, PriceBounds, UrlUpdate,
};
use crate::pagination::controller::PageController;

pub struct CatalogSession<S> {
    source: S,
    nomenclature_id: String,
    store: FilterStore,
    controller: PageController,
    facets: Option<FacetSet>,
}

impl<S: ProductSource> CatalogSession<S> {
    pub fn new(source: S, nomenclature_id: impl Into<String>, mode: BrandSelectionMode) -> Self {
        Self {
            source,
            nomenclature_id: nomenclature_id.into(),
            store: FilterStore::new(mode),
            controller: PageController::default(),
            facets: None,
        }
    }

    pub fn with_controller(mut self, controller: PageController) -> Self {
        self.controller = controller;
        self
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn controller(&self) -> &PageController {
        &self.controller
    }

    /// Filter facets from the last successful fetch (brand list, categories,
    /// dynamic price range).
    pub fn facets(&self) -> Option<&FacetSet> {
        self.facets.as_ref()
    }

    /// Mount or external navigation: sync state from the URL and refetch.
    pub async fn navigate(&mut self, query: &str) {
        self.store
            .dispatch(FilterEvent::ExternalNavigation(query.to_string()));
        self.refresh().await;
    }

    /// A local interaction. Returns the URL update the host must apply via a
    /// history replace; `None` only if the store swallowed the event.
    pub async fn dispatch(&mut self, action: FilterAction) -> Option<UrlUpdate> {
        let update = self.store.dispatch(FilterEvent::UserEdit(action));
        if update.is_some() {
            self.refresh().await;
        }
        update
    }

    /// Open the small-viewport filter sheet against the current state.
    pub fn open_sheet(&self, dismiss: DismissBehavior) -> DraftSession {
        DraftSession::open(&self.store, dismiss)
    }

    /// Commit an explicitly applied draft.
    pub async fn commit_draft(&mut self, draft: DraftSession) -> UrlUpdate {
        self.commit_filters(draft.apply()).await
    }

    /// Commit a whole state at once (draft apply, or an apply-on-dismiss that
    /// produced `Some` state).
    pub async fn commit_filters(&mut self, state: FilterState) -> UrlUpdate {
        let update = self.store.commit(state);
        self.refresh().await;
        update
    }

    /// The grid reported a failed image load.
    pub fn report_broken_image(&mut self, product_id: &str, url: &str) {
        self.controller.report_broken_image(product_id, url);
    }

    /// Fetch the current page for the committed filters, then top the grid
    /// up from subsequent pages if broken images left it short.
    pub async fn refresh(&mut self) {
        let page = self.store.state().page;
        let ticket = self.controller.begin_load(page);
        let result = self
            .source
            .fetch_page(&self.nomenclature_id, self.store.state(), ticket.page())
            .await;
        if let Some(facets) = result.facets.clone() {
            if let Some(range) = facets.price_range {
                self.store.set_bounds(PriceBounds {
                    min: range.min.floor() as i64,
                    max: range.max.ceil() as i64,
                });
            }
            self.facets = Some(facets);
        }
        self.controller.complete_load(ticket, Some(result));
        info!(
            nomenclature = %self.nomenclature_id,
            page,
            visible = self.controller.visible().len(),
            total = self.controller.total(),
            "catalog page loaded"
        );
        self.run_backfill().await;
    }

    /// Drive the backfill state machine until the grid is full, the pages are
    /// exhausted, or nothing more is due. Waits out the cooldown between
    /// attempts instead of spinning.
    pub async fn run_backfill(&mut self) {
        loop {
            let now = Instant::now();
            if let Some(ticket) = self.controller.begin_backfill(now) {
                let result = self
                    .source
                    .fetch_page(&self.nomenclature_id, self.store.state(), ticket.page())
                    .await;
                self.controller
                    .complete_backfill(ticket, Some(result), Instant::now());
                continue;
            }
            if let Some(wait) = self.controller.cooldown_remaining(now) {
                if self.controller.needs_backfill(now + wait) {
                    debug!(?wait, "waiting out backfill cooldown");
                    tokio::time::sleep(wait).await;
                    continue;
                }
            }
            break;
        }
    }
}
