pub mod controller;
pub mod pages;

pub use controller::{FetchTicket, PageController};
pub use pages::{visible_pages, PageItem};
