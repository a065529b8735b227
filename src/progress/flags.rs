//! Items the learner explicitly marked as unfamiliar

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, LearningItem};

/// Set of manually flagged item ids, persisted as a JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualFlags {
    ids: BTreeSet<String>,
}

impl ManualFlags {
    /// Rebuild from a persisted array, keeping only known item ids
    pub fn from_value(value: &Value, catalog: &Catalog) -> Self {
        let Some(entries) = value.as_array() else {
            tracing::warn!("Manual flag record is not an array, starting fresh");
            return Self::default();
        };

        let ids = entries
            .iter()
            .filter_map(Value::as_str)
            .filter(|id| catalog.contains(id))
            .map(str::to_string)
            .collect();
        Self { ids }
    }

    /// Flag or unflag an item; returns whether anything changed
    pub fn set(&mut self, id: &str, flagged: bool) -> bool {
        if flagged { self.ids.insert(id.to_string()) } else { self.ids.remove(id) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flagged ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Flagged items ordered by category, then by script
    pub fn sorted_items<'a>(&self, catalog: &'a Catalog) -> Vec<&'a LearningItem> {
        let mut items: Vec<&LearningItem> = self.ids().filter_map(|id| catalog.get(id)).collect();
        items.sort_by(|a, b| {
            catalog
                .category_order(a.category)
                .cmp(&catalog.category_order(b.category))
                .then_with(|| a.script.cmp(&b.script))
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::store::fixtures::catalog;

    #[test]
    fn set_reports_changes() {
        let mut flags = ManualFlags::default();
        assert!(flags.set("a", true));
        assert!(!flags.set("a", true));
        assert!(flags.contains("a"));
        assert!(flags.set("a", false));
        assert!(!flags.set("a", false));
        assert!(flags.is_empty());
    }

    #[test]
    fn from_value_filters_unknown_and_non_string_entries() {
        let flags = ManualFlags::from_value(&json!(["a", 7, "ghost", "e"]), &catalog());
        let ids: Vec<&str> = flags.ids().collect();
        assert_eq!(ids, vec!["a", "e"]);
    }

    #[test]
    fn from_value_rejects_non_array() {
        let flags = ManualFlags::from_value(&json!({"a": true}), &catalog());
        assert!(flags.is_empty());
    }

    #[test]
    fn sorted_items_follow_category_order() {
        let catalog = catalog();
        let mut flags = ManualFlags::default();
        flags.set("h", true);
        flags.set("e", true);
        flags.set("b", true);

        let ids: Vec<&str> = flags.sorted_items(&catalog).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "e", "h"]);
    }

    #[test]
    fn persists_as_array() {
        let mut flags = ManualFlags::default();
        flags.set("b", true);
        flags.set("a", true);
        assert_eq!(serde_json::to_value(&flags).unwrap(), json!(["a", "b"]));
    }
}
