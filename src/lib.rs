pub mod api;
pub mod catalog;
pub mod filters;
pub mod grid;
pub mod pagination;
pub mod session;
pub mod tracing;

pub mod util {
    pub mod env;
}

pub use api::client::{CatalogClient, CatalogConfig};
pub use catalog::product::{Product, PLACEHOLDER_IMAGE};
pub use filters::state::{FilterState, FilterStore};
pub use pagination::controller::PageController;
pub use session::CatalogSession;
