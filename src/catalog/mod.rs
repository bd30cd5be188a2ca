pub mod normalize;
pub mod product;

pub use normalize::normalize_product;
pub use product::{Product, Subcategory};
