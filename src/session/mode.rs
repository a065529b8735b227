//! Normal gated practice versus focused drills

use std::collections::HashMap;

use serde::Serialize;

use crate::learning::stage_gate::{PASS_ACCURACY, PASS_STREAK};

/// Item streak that clears an item out of the unfamiliar drill
pub const DRILL_CLEAR_STREAK: u32 = 3;

/// Item streak that clears a manual flag during normal practice
pub const GATED_CLEAR_STREAK: u32 = 5;

/// What a custom session was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillKind {
    /// An explicit list of ids
    Focused,
    /// The manually flagged items; items leave the pool once they stick
    Unfamiliar,
}

/// Running totals for a custom session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CustomStats {
    pub attempts: u32,
    pub correct: u32,
    pub consecutive: u32,
}

impl CustomStats {
    /// Count one answer
    pub fn record(&mut self, is_correct: bool) {
        self.attempts += 1;
        if is_correct {
            self.correct += 1;
            self.consecutive += 1;
        } else {
            self.consecutive = 0;
        }
    }

    /// Accuracy and streak thresholds both hold
    pub fn is_complete(&self) -> bool {
        self.attempts > 0
            && self.correct as f64 / self.attempts as f64 >= PASS_ACCURACY
            && self.consecutive >= PASS_STREAK
    }
}

/// A temporary sub-session over an explicit subset of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSession {
    pub label: String,
    pub kind: DrillKind,
    pub stats: CustomStats,
    pool: Vec<String>,
    /// Consecutive correct answers per item since the drill started
    runs: HashMap<String, u32>,
}

impl CustomSession {
    /// New session; `pool` must already be de-duplicated
    pub fn new(label: impl Into<String>, kind: DrillKind, pool: Vec<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            stats: CustomStats::default(),
            pool,
            runs: HashMap::new(),
        }
    }

    /// Count an answer for one item, returning its run inside this drill
    pub fn record_item(&mut self, id: &str, is_correct: bool) -> u32 {
        let run = self.runs.entry(id.to_string()).or_default();
        *run = if is_correct { *run + 1 } else { 0 };
        *run
    }

    /// Remaining item ids
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pool.iter().any(|candidate| candidate == id)
    }

    /// Drop an item from the pool; returns whether it was present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.pool.len();
        self.pool.retain(|candidate| candidate != id);
        self.pool.len() < before
    }

    pub fn is_exhausted(&self) -> bool {
        self.pool.is_empty()
    }
}

/// Which pool the next card comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionMode {
    #[default]
    Gated,
    Custom(CustomSession),
}

impl SessionMode {
    pub fn is_custom(&self) -> bool {
        matches!(self, SessionMode::Custom(_))
    }

    pub fn custom(&self) -> Option<&CustomSession> {
        match self {
            SessionMode::Custom(session) => Some(session),
            SessionMode::Gated => None,
        }
    }

    pub fn custom_mut(&mut self) -> Option<&mut CustomSession> {
        match self {
            SessionMode::Custom(session) => Some(session),
            SessionMode::Gated => None,
        }
    }
}
