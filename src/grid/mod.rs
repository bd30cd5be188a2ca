pub mod images;

pub use images::BrokenImageTracker;
