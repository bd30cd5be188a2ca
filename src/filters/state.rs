//! Filter state and its store.
//!
//! The store is the single source of truth for the active filters and is kept
//! in sync with the URL query string in both directions. Instead of a mutable
//! "user initiated" flag, every change arrives as a tagged [`FilterEvent`]:
//! a `UserEdit` mutates the state and emits a history-replacing [`UrlUpdate`],
//! while an `ExternalNavigation` overwrites the state from the URL unless it
//! is the echo of the store's own just-issued update (suppressed for exactly
//! one round trip).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Default => "default",
            SortKey::PriceAsc => "price-asc",
            SortKey::PriceDesc => "price-desc",
            SortKey::Newest => "newest",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(SortKey::Default),
            "price-asc" => Some(SortKey::PriceAsc),
            "price-desc" => Some(SortKey::PriceDesc),
            "newest" => Some(SortKey::Newest),
            _ => None,
        }
    }
}

/// How brand toggles behave. The subcategory page uses single-select (a new
/// brand replaces the old one); the general catalog sidebar multi-selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandSelectionMode {
    Single,
    Multi,
}

/// Effective price bounds reported by the server for the current result set.
/// An explicit min/max equal to these bounds is redundant and stays out of
/// the URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub brands: Vec<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub categories: Vec<String>,
    pub sort: SortKey,
    pub in_stock_only: bool,
    /// 1-based page shown in the pagination control.
    pub page: u32,
    /// Upstream source selector, carried in the URL as `type=rost`.
    pub rost: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brands: Vec::new(),
            min_price: None,
            max_price: None,
            categories: Vec::new(),
            sort: SortKey::Default,
            in_stock_only: false,
            page: 1,
            rost: false,
        }
    }
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        *self == FilterState::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    ToggleBrand(String),
    ToggleCategory(String),
    SetPriceRange {
        min: Option<i64>,
        max: Option<i64>,
    },
    SetSort(SortKey),
    SetInStockOnly(bool),
    SetPage(u32),
    ClearAll,
}

/// A change arriving at the store, tagged by who initiated it.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEvent {
    /// A local interaction (toggle, price commit, sort change, page click).
    UserEdit(FilterAction),
    /// The URL changed under the store (back button, external link); the
    /// payload is the query string without the leading `?`.
    ExternalNavigation(String),
}

/// Navigation instruction emitted after a committed change. Always a history
/// replace, never a push, so filter tweaks do not grow browser history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlUpdate {
    Replace(String),
}

impl UrlUpdate {
    pub fn query(&self) -> &str {
        match self {
            UrlUpdate::Replace(q) => q,
        }
    }
}

/// Apply one action to a state. Any change other than an explicit page
/// selection resets the page to 1.
pub fn apply_action(state: &mut FilterState, action: FilterAction, mode: BrandSelectionMode) {
    match action {
        FilterAction::ToggleBrand(id) => {
            if let Some(pos) = state.brands.iter().position(|b| *b == id) {
                state.brands.remove(pos);
            } else {
                match mode {
                    BrandSelectionMode::Single => state.brands = vec![id],
                    BrandSelectionMode::Multi => state.brands.push(id),
                }
            }
            state.page = 1;
        }
        FilterAction::ToggleCategory(id) => {
            if let Some(pos) = state.categories.iter().position(|c| *c == id) {
                state.categories.remove(pos);
            } else {
                state.categories.push(id);
            }
            state.page = 1;
        }
        FilterAction::SetPriceRange { min, max } => {
            state.min_price = min;
            state.max_price = max;
            state.page = 1;
        }
        FilterAction::SetSort(sort) => {
            state.sort = sort;
            state.page = 1;
        }
        FilterAction::SetInStockOnly(flag) => {
            state.in_stock_only = flag;
            state.page = 1;
        }
        FilterAction::SetPage(page) => {
            state.page = page.max(1);
        }
        FilterAction::ClearAll => {
            let rost = state.rost;
            *state = FilterState::default();
            state.rost = rost;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterStore {
    state: FilterState,
    bounds: Option<PriceBounds>,
    mode: BrandSelectionMode,
    suppress_next_sync: bool,
}

impl FilterStore {
    pub fn new(mode: BrandSelectionMode) -> Self {
        Self {
            state: FilterState::default(),
            bounds: None,
            mode,
            suppress_next_sync: false,
        }
    }

    /// Seed the store from the URL on mount.
    pub fn from_query(raw: &str, mode: BrandSelectionMode) -> Self {
        Self {
            state: query::decode(raw),
            bounds: None,
            mode,
            suppress_next_sync: false,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn mode(&self) -> BrandSelectionMode {
        self.mode
    }

    pub fn bounds(&self) -> Option<PriceBounds> {
        self.bounds
    }

    /// Record the server-supplied effective price bounds for the current
    /// result set; subsequent URL encodes drop min/max equal to them.
    pub fn set_bounds(&mut self, bounds: PriceBounds) {
        self.bounds = Some(bounds);
    }

    /// Feed one event through the store. User edits commit immediately and
    /// return the replace-navigation carrying only non-default parameters;
    /// external navigations either re-sync the state or are swallowed when
    /// they echo the store's own last update.
    pub fn dispatch(&mut self, event: FilterEvent) -> Option<UrlUpdate> {
        match event {
            FilterEvent::UserEdit(action) => {
                apply_action(&mut self.state, action, self.mode);
                self.suppress_next_sync = true;
                Some(UrlUpdate::Replace(query::encode(&self.state, self.bounds)))
            }
            FilterEvent::ExternalNavigation(raw) => {
                if self.suppress_next_sync {
                    self.suppress_next_sync = false;
                    debug!("ignoring URL sync echo of a local filter edit");
                    return None;
                }
                self.state = query::decode(&raw);
                None
            }
        }
    }

    /// Replace the whole committed state at once (used when a mobile draft is
    /// applied); behaves like a user edit for URL-sync purposes.
    pub fn commit(&mut self, state: FilterState) -> UrlUpdate {
        self.state = state;
        self.suppress_next_sync = true;
        UrlUpdate::Replace(query::encode(&self.state, self.bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_select_brand_replaces_previous_selection() {
        let mut state = FilterState::default();
        apply_action(
            &mut state,
            FilterAction::ToggleBrand("b1".into()),
            BrandSelectionMode::Single,
        );
        assert_eq!(state.brands, vec!["b1"]);
        apply_action(
            &mut state,
            FilterAction::ToggleBrand("b2".into()),
            BrandSelectionMode::Single,
        );
        assert_eq!(state.brands, vec!["b2"]);
        // Toggling the selected brand clears the selection.
        apply_action(
            &mut state,
            FilterAction::ToggleBrand("b2".into()),
            BrandSelectionMode::Single,
        );
        assert!(state.brands.is_empty());
    }

    #[test]
    fn multi_select_brand_accumulates() {
        let mut state = FilterState::default();
        for id in ["b1", "b2"] {
            apply_action(
                &mut state,
                FilterAction::ToggleBrand(id.into()),
                BrandSelectionMode::Multi,
            );
        }
        assert_eq!(state.brands, vec!["b1", "b2"]);
        apply_action(
            &mut state,
            FilterAction::ToggleBrand("b1".into()),
            BrandSelectionMode::Multi,
        );
        assert_eq!(state.brands, vec!["b2"]);
    }

    #[test]
    fn sort_change_resets_page() {
        let mut state = FilterState {
            page: 5,
            ..FilterState::default()
        };
        apply_action(
            &mut state,
            FilterAction::SetSort(SortKey::PriceAsc),
            BrandSelectionMode::Single,
        );
        assert_eq!(state.page, 1);
        assert_eq!(state.sort, SortKey::PriceAsc);
    }

    #[test]
    fn user_edit_suppresses_exactly_one_external_sync() {
        let mut store = FilterStore::new(BrandSelectionMode::Single);
        let update = store
            .dispatch(FilterEvent::UserEdit(FilterAction::ToggleBrand("b1".into())))
            .expect("user edit emits a url update");
        assert_eq!(store.state().brands, vec!["b1"]);

        // The echo of our own navigation must not clobber local state.
        store.dispatch(FilterEvent::ExternalNavigation(update.query().to_string()));
        assert_eq!(store.state().brands, vec!["b1"]);

        // A second external navigation is a real one and re-syncs.
        store.dispatch(FilterEvent::ExternalNavigation("brand=b9".into()));
        assert_eq!(store.state().brands, vec!["b9"]);
    }

    #[test]
    fn clear_all_keeps_the_source_selector() {
        let mut state = FilterState {
            rost: true,
            brands: vec!["b1".into()],
            ..FilterState::default()
        };
        apply_action(&mut state, FilterAction::ClearAll, BrandSelectionMode::Multi);
        assert!(state.brands.is_empty());
        assert!(state.rost);
    }
}
