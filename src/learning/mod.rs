//! Adaptive learning engine
//!
//! Pure building blocks: weighting and drawing items, gating categories behind
//! stages, building answer options, and tracking daily activity. None of these types
//! touch storage; the session controller persists their state.

pub mod daily;
pub mod distractors;
pub mod random;
pub mod sampler;
pub mod stage_gate;

pub use daily::{DailyGoal, DailyProgress};
pub use distractors::generate_options;
pub use random::{RandomSource, ScriptedRandom, SeededRandom, shuffle};
pub use sampler::{compute_weight, pick_weighted_item};
pub use stage_gate::{StageAdvance, StageGate, StageGateRecord, StageState, StageStats};
