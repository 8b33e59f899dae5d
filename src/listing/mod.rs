//! Listing model, selector chains and field extraction.

pub mod extractor;
pub mod models;
pub mod selectors;

pub use extractor::FieldExtractor;
pub use models::{Listing, PRICE_NOT_SPECIFIED};
pub use selectors::SelectorSet;
