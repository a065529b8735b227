//! Catalog loading and lookup

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

use super::model::{Category, CategoryMeta, LearningItem, Stage};

/// The dataset shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Errors found while loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The dataset is not valid JSON for the catalog shape
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// No items at all
    #[error("Catalog contains no items")]
    Empty,

    /// No stages at all
    #[error("Catalog defines no stages")]
    NoStages,

    /// Two items share an id
    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    /// A breakdown references an id that does not exist
    #[error("Item {item} references unknown breakdown item {missing}")]
    UnknownBreakdown {
        /// Item holding the breakdown
        item: String,
        /// The id that could not be resolved
        missing: String,
    },

    /// A category with items is not owned by any stage
    #[error("Category {0} is not assigned to any stage")]
    UnstagedCategory(Category),

    /// A category is owned by more than one stage
    #[error("Category {0} is assigned to more than one stage")]
    OverlappingStage(Category),

    /// A mnemonic question whose answer is not among its options
    #[error("Mnemonic answer for {0} is not one of its options")]
    MnemonicAnswerMissing(String),
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    categories: Vec<CategoryMeta>,
    stages: Vec<Stage>,
    items: Vec<LearningItem>,
}

/// Validated, immutable learning content
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<CategoryMeta>,
    stages: Vec<Stage>,
    items: Vec<LearningItem>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Load the embedded dataset
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::new(raw.categories, raw.stages, raw.items)
    }

    /// Build a catalog from parts, checking its structural rules
    pub fn new(
        categories: Vec<CategoryMeta>,
        stages: Vec<Stage>,
        items: Vec<LearningItem>,
    ) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        if stages.is_empty() {
            return Err(CatalogError::NoStages);
        }

        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateItem(item.id.clone()));
            }
        }

        for item in &items {
            if let Some(missing) = item.breakdown.iter().find(|id| !index.contains_key(*id)) {
                return Err(CatalogError::UnknownBreakdown {
                    item: item.id.clone(),
                    missing: missing.clone(),
                });
            }
            if let Some(question) = &item.mnemonic_question {
                if !question.options.contains(&question.answer) {
                    return Err(CatalogError::MnemonicAnswerMissing(item.id.clone()));
                }
            }
        }

        // Stages must partition the categories that actually have items
        let mut staged = HashSet::new();
        for stage in &stages {
            for category in &stage.categories {
                if !staged.insert(*category) {
                    return Err(CatalogError::OverlappingStage(*category));
                }
            }
        }
        if let Some(item) = items.iter().find(|item| !staged.contains(&item.category)) {
            return Err(CatalogError::UnstagedCategory(item.category));
        }

        Ok(Self { categories, stages, items, index })
    }

    /// All items in dataset order
    pub fn items(&self) -> &[LearningItem] {
        &self.items
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&LearningItem> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    /// Whether an id names a catalog item
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The item used whenever a selection pool comes up empty
    pub fn default_item(&self) -> &LearningItem {
        &self.items[0]
    }

    /// Ordered stages
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Category display metadata
    pub fn categories(&self) -> &[CategoryMeta] {
        &self.categories
    }

    /// Display metadata for one category
    pub fn category_meta(&self, category: Category) -> Option<&CategoryMeta> {
        self.categories.iter().find(|meta| meta.id == category)
    }

    /// Sort key for a category (dataset order, unknown categories last)
    pub fn category_order(&self, category: Category) -> usize {
        self.categories.iter().position(|meta| meta.id == category).unwrap_or(usize::MAX)
    }

    /// Items belonging to a category
    pub fn items_in(&self, category: Category) -> impl Iterator<Item = &LearningItem> {
        self.items.iter().filter(move |item| item.category == category)
    }

    /// Resolve a word's breakdown into items
    pub fn breakdown_of(&self, item: &LearningItem) -> Vec<&LearningItem> {
        item.breakdown.iter().filter_map(|id| self.get(id)).collect()
    }
}
