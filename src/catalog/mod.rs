//! Static learning content
//!
//! The catalog is declarative: categories, the ordered stages that gate them, and the
//! learning items themselves. It is loaded once from the embedded JSON dataset and
//! never mutated afterwards.

pub mod model;
pub mod store;

// Re-exports
pub use model::{Category, CategoryMeta, LearningItem, MnemonicQuestion, Stage};
pub use store::{Catalog, CatalogError};
