//! Staged category unlocking
//!
//! Stages are walked strictly in order. The first stage that has not passed is the
//! current one; everything before it has passed and everything after it is locked.
//! A stage passes once its accuracy reaches [`PASS_ACCURACY`] while its run of
//! consecutive correct answers is at least [`PASS_STREAK`]. Passing is permanent.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Category, Stage};

/// Minimum fraction correct for a stage to pass
pub const PASS_ACCURACY: f64 = 0.8;

/// Minimum consecutive correct answers for a stage to pass
pub const PASS_STREAK: u32 = 10;

/// Current layout of [`StageGateRecord`]
pub const STAGE_GATE_VERSION: u32 = 1;

/// Counters for one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageStats {
    pub attempts: u32,
    pub correct: u32,
    pub consecutive: u32,
    pub passed: bool,
}

impl StageStats {
    /// Fraction correct, if attempted
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.correct as f64 / self.attempts as f64)
    }

    /// Both pass thresholds hold right now
    pub fn meets_pass_condition(&self) -> bool {
        self.accuracy().is_some_and(|accuracy| accuracy >= PASS_ACCURACY)
            && self.consecutive >= PASS_STREAK
    }

    fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value.get(name).and_then(Value::as_u64).map(|n| n.min(u32::MAX as u64) as u32)
        };
        let correct = field("correct").unwrap_or(0);
        Self {
            attempts: field("attempts").unwrap_or(0).max(correct),
            correct,
            consecutive: field("consecutive").unwrap_or(0).min(correct),
            passed: value.get("passed").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// Where a stage sits relative to the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    Locked,
    Current,
    Passed,
}

/// Persisted form of the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageGateRecord {
    pub version: u32,
    pub stats: BTreeMap<String, StageStats>,
    pub current_stage: String,
}

/// Emitted when an answer makes a stage pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAdvance {
    /// The stage that just passed
    pub passed: String,
    /// The stage that opened as a result, `None` after the final stage
    pub unlocked: Option<String>,
}

/// Ordered stages plus their mutable counters
#[derive(Debug, Clone)]
pub struct StageGate {
    stages: Vec<Stage>,
    stats: HashMap<String, StageStats>,
    current: usize,
}

impl StageGate {
    /// A fresh gate with the first stage current
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages, stats: HashMap::new(), current: 0 }
    }

    /// Restore counters from a persisted record
    ///
    /// Unknown stage ids are ignored. Passed flags only count as an unbroken run from
    /// the first stage, and the current stage is recomputed rather than trusted.
    pub fn from_value(stages: Vec<Stage>, value: &Value) -> Self {
        let mut gate = Self::new(stages);

        let version = value.get("version").and_then(Value::as_u64).unwrap_or(1);
        if version > STAGE_GATE_VERSION as u64 {
            tracing::warn!(version, "Stage gate record is newer than supported, reading anyway");
        }

        if let Some(entries) = value.get("stats").and_then(Value::as_object) {
            let mut prefix_passed = true;
            for stage in &gate.stages {
                let Some(entry) = entries.get(&stage.id) else {
                    prefix_passed = false;
                    continue;
                };
                let mut stats = StageStats::from_value(entry);
                if stats.passed && !prefix_passed {
                    tracing::warn!(stage = %stage.id, "Ignoring pass flag after a locked stage");
                    stats.passed = false;
                }
                prefix_passed &= stats.passed;
                gate.stats.insert(stage.id.clone(), stats);
            }
        }

        gate.recompute_current();

        let stored = value.get("currentStage").and_then(Value::as_str);
        if stored.is_some_and(|id| id != gate.current_stage_id()) {
            tracing::debug!(?stored, current = gate.current_stage_id(), "Recomputed current stage");
        }
        gate
    }

    /// Snapshot for persistence
    pub fn record(&self) -> StageGateRecord {
        StageGateRecord {
            version: STAGE_GATE_VERSION,
            stats: self.stats.iter().map(|(id, stats)| (id.clone(), *stats)).collect(),
            current_stage: self.current_stage_id().to_string(),
        }
    }

    /// Ordered stages
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The first stage that has not passed, or the last stage when all have
    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current)
    }

    /// Id of the current stage (empty only for a gate without stages)
    pub fn current_stage_id(&self) -> &str {
        self.current_stage().map(|stage| stage.id.as_str()).unwrap_or("")
    }

    /// Counters for a stage
    pub fn stats(&self, stage_id: &str) -> StageStats {
        self.stats.get(stage_id).copied().unwrap_or_default()
    }

    /// State of a stage, `None` for an unknown id
    pub fn state(&self, stage_id: &str) -> Option<StageState> {
        let position = self.stages.iter().position(|stage| stage.id == stage_id)?;
        Some(self.state_at(position))
    }

    fn state_at(&self, position: usize) -> StageState {
        let stage = &self.stages[position];
        if self.stats(&stage.id).passed {
            StageState::Passed
        } else if position == self.current {
            StageState::Current
        } else {
            StageState::Locked
        }
    }

    /// Whether every stage has passed
    pub fn all_passed(&self) -> bool {
        self.stages.iter().all(|stage| self.stats(&stage.id).passed)
    }

    /// The stage that owns a category
    pub fn stage_of(&self, category: Category) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.contains(category))
    }

    /// Categories of passed stages plus the current stage
    pub fn allowed_categories(&self) -> BTreeSet<Category> {
        self.stages
            .iter()
            .enumerate()
            .filter(|(position, _)| self.state_at(*position) != StageState::Locked)
            .flat_map(|(_, stage)| stage.categories.iter().copied())
            .collect()
    }

    /// Whether a category may be practiced
    pub fn is_allowed(&self, category: Category) -> bool {
        self.stages
            .iter()
            .position(|stage| stage.contains(category))
            .is_some_and(|position| self.state_at(position) != StageState::Locked)
    }

    /// Record an answer in the category's stage
    ///
    /// Answers for categories in locked stages are ignored. Returns the advance when
    /// this answer made the stage pass.
    pub fn update(&mut self, category: Category, is_correct: bool) -> Option<StageAdvance> {
        let position = self.stages.iter().position(|stage| stage.contains(category))?;
        if self.state_at(position) == StageState::Locked {
            tracing::debug!(%category, "Ignoring answer for a locked stage");
            return None;
        }

        let stage_id = self.stages[position].id.clone();
        let stats = self.stats.entry(stage_id.clone()).or_default();
        stats.attempts += 1;
        if is_correct {
            stats.correct += 1;
            stats.consecutive += 1;
        } else {
            stats.consecutive = 0;
        }

        if stats.passed || !stats.meets_pass_condition() {
            return None;
        }
        stats.passed = true;

        self.recompute_current();
        let unlocked = self
            .current_stage()
            .filter(|stage| !self.stats(&stage.id).passed)
            .map(|stage| stage.id.clone());
        tracing::info!(stage = %stage_id, ?unlocked, "Stage passed");
        Some(StageAdvance { passed: stage_id, unlocked })
    }

    /// Clear every counter and relock all stages after the first
    pub fn reset(&mut self) {
        self.stats.clear();
        self.current = 0;
    }

    fn recompute_current(&mut self) {
        self.current = self
            .stages
            .iter()
            .position(|stage| !self.stats(&stage.id).passed)
            .unwrap_or(self.stages.len().saturating_sub(1));
    }
}
