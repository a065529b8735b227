//! Per-item mastery tracking

pub mod flags;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, LearningItem};

pub use flags::ManualFlags;

/// Mastery counters for a single item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStats {
    /// Total times quizzed
    pub attempts: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// Bounded by the item's mastery goal
    pub score: u32,
    /// Consecutive correct answers
    pub streak: u32,
}

impl ItemStats {
    /// Apply one answer against a mastery goal
    pub fn apply(&mut self, is_correct: bool, mastery_goal: u32) {
        self.attempts += 1;
        if is_correct {
            self.correct += 1;
            self.score = (self.score + 1).min(mastery_goal);
            self.streak += 1;
        } else {
            self.incorrect += 1;
            self.score = self.score.saturating_sub(1);
            self.streak = 0;
        }
    }

    /// Fraction answered correctly, if the item was ever attempted
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.correct as f64 / self.attempts as f64)
    }

    /// Whether the score has reached the goal
    pub fn is_mastered(&self, mastery_goal: u32) -> bool {
        self.score >= mastery_goal
    }

    /// Decode a persisted entry one field at a time, then restore the invariants
    fn from_value(value: &Value, mastery_goal: u32) -> Self {
        let field = |name: &str| {
            value.get(name).and_then(Value::as_u64).map(|n| n.min(u32::MAX as u64) as u32)
        };
        let correct = field("correct").unwrap_or(0);
        let incorrect = field("incorrect").unwrap_or(0);
        Self {
            attempts: correct.saturating_add(incorrect),
            correct,
            incorrect,
            score: field("score").unwrap_or(0).min(mastery_goal),
            streak: field("streak").unwrap_or(0).min(correct),
        }
    }
}

/// An attempted item ranked by how badly it is going
#[derive(Debug, Clone)]
pub struct TroubleEntry<'a> {
    pub item: &'a LearningItem,
    pub stats: ItemStats,
    pub accuracy: f64,
}

/// All per-item stats, keyed by item id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressStore {
    items: HashMap<String, ItemStats>,
}

impl ProgressStore {
    /// Rebuild the store from a persisted record
    ///
    /// Entries for ids the catalog does not know are dropped; malformed fields fall back
    /// to zero and counters are repaired so `attempts == correct + incorrect`.
    pub fn from_value(value: &Value, catalog: &Catalog) -> Self {
        let Some(entries) = value.as_object() else {
            tracing::warn!("Progress record is not an object, starting fresh");
            return Self::default();
        };

        let items = entries
            .iter()
            .filter_map(|(id, entry)| match catalog.get(id) {
                Some(item) => Some((id.clone(), ItemStats::from_value(entry, item.mastery_goal))),
                None => {
                    tracing::debug!(id = %id, "Dropping progress for unknown item");
                    None
                }
            })
            .collect();

        Self { items }
    }

    /// Stats for an item, creating a zeroed record on first access
    pub fn get_stats(&mut self, id: &str) -> &ItemStats {
        self.items.entry(id.to_string()).or_default()
    }

    /// Stats for an item without inserting anything
    pub fn peek(&self, id: &str) -> ItemStats {
        self.items.get(id).copied().unwrap_or_default()
    }

    /// Apply an answer to an item and return the updated stats
    pub fn record_result(&mut self, item: &LearningItem, is_correct: bool) -> ItemStats {
        let stats = self.items.entry(item.id.clone()).or_default();
        stats.apply(is_correct, item.mastery_goal);
        *stats
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Number of items with a record
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item has a record
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attempted items with the worst accuracy first, ties broken by more attempts
    pub fn trouble_items<'a>(&self, catalog: &'a Catalog, limit: usize) -> Vec<TroubleEntry<'a>> {
        let mut entries: Vec<TroubleEntry<'a>> = catalog
            .items()
            .iter()
            .filter_map(|item| {
                let stats = self.peek(&item.id);
                stats.accuracy().map(|accuracy| TroubleEntry { item, stats, accuracy })
            })
            .collect();

        entries.sort_by(|a, b| {
            a.accuracy.total_cmp(&b.accuracy).then(b.stats.attempts.cmp(&a.stats.attempts))
        });
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::catalog::Category;
    use crate::catalog::store::fixtures::{catalog, item};

    #[test]
    fn get_stats_creates_zeroed_entry() {
        let mut progress = ProgressStore::default();
        assert_eq!(*progress.get_stats("a"), ItemStats::default());
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn peek_does_not_insert() {
        let progress = ProgressStore::default();
        assert_eq!(progress.peek("a"), ItemStats::default());
        assert!(progress.is_empty());
    }

    #[test]
    fn correct_answers_cap_at_goal() {
        let mut progress = ProgressStore::default();
        let mut item = item("a", Category::Consonant, "ah");
        item.mastery_goal = 2;

        for _ in 0..4 {
            progress.record_result(&item, true);
        }

        let stats = progress.peek("a");
        assert_eq!(
            stats,
            ItemStats { attempts: 4, correct: 4, incorrect: 0, score: 2, streak: 4 }
        );
        assert!(stats.is_mastered(2));
    }

    #[test]
    fn incorrect_answer_floors_score_and_breaks_streak() {
        let mut progress = ProgressStore::default();
        let item = item("a", Category::Consonant, "ah");

        progress.record_result(&item, false);
        progress.record_result(&item, true);
        progress.record_result(&item, true);
        let stats = progress.record_result(&item, false);

        assert_eq!(
            stats,
            ItemStats { attempts: 4, correct: 2, incorrect: 2, score: 1, streak: 0 }
        );
    }

    #[test]
    fn trouble_items_rank_by_accuracy_then_attempts() {
        let catalog = catalog();
        let mut progress = ProgressStore::default();
        let a = catalog.get("a").unwrap();
        let b = catalog.get("b").unwrap();
        let c = catalog.get("c").unwrap();

        // a: 1/2, b: 0/1, c: 0/3
        progress.record_result(a, true);
        progress.record_result(a, false);
        progress.record_result(b, false);
        for _ in 0..3 {
            progress.record_result(c, false);
        }

        let ids: Vec<&str> =
            progress.trouble_items(&catalog, 5).iter().map(|e| e.item.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(progress.trouble_items(&catalog, 1).len(), 1);
    }

    #[test]
    fn from_value_repairs_counters_and_drops_unknown_ids() {
        let catalog = catalog();
        let value = json!({
            "a": { "attempts": 99, "correct": 3, "incorrect": 1, "score": 40, "streak": 7 },
            "b": { "correct": "three", "incorrect": 2 },
            "ghost": { "attempts": 1, "correct": 1 }
        });

        let progress = ProgressStore::from_value(&value, &catalog);

        assert_eq!(progress.len(), 2);
        assert_eq!(
            progress.peek("a"),
            ItemStats { attempts: 4, correct: 3, incorrect: 1, score: 5, streak: 3 }
        );
        assert_eq!(
            progress.peek("b"),
            ItemStats { attempts: 2, correct: 0, incorrect: 2, score: 0, streak: 0 }
        );
    }

    #[test]
    fn from_value_rejects_non_object() {
        let progress = ProgressStore::from_value(&json!([1, 2, 3]), &catalog());
        assert!(progress.is_empty());
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut progress = ProgressStore::default();
        progress.record_result(&item("a", Category::Consonant, "ah"), true);
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["a"]["correct"], json!(1));
        assert_eq!(value["a"]["score"], json!(1));
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_answer_sequence(
            answers in proptest::collection::vec(any::<bool>(), 0..200),
            goal in 1u32..10,
        ) {
            let mut progress = ProgressStore::default();
            let mut item = item("a", Category::Consonant, "ah");
            item.mastery_goal = goal;

            let mut previous_streak = 0;
            for is_correct in answers {
                let stats = progress.record_result(&item, is_correct);
                prop_assert_eq!(stats.attempts, stats.correct + stats.incorrect);
                prop_assert!(stats.score <= goal);
                if is_correct {
                    prop_assert_eq!(stats.streak, previous_streak + 1);
                } else {
                    prop_assert_eq!(stats.streak, 0);
                }
                previous_streak = stats.streak;
            }
        }
    }
}
