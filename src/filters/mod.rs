pub mod draft;
pub mod query;
pub mod state;

pub use draft::{DismissBehavior, DraftSession};
pub use state::{
    BrandSelectionMode, FilterAction, FilterEvent, FilterState, FilterStore, PriceBounds, SortKey,
    UrlUpdate,
};
