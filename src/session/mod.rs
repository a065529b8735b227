//! Session control
//!
//! [`Trainer`] is the single owner of all mutable learning state. The rendering layer
//! calls its operations in response to user actions and redraws from the returned
//! [`Snapshot`]. Delayed transitions are handed out as [`PendingAdvance`] tokens that
//! go stale as soon as another card is shown.

pub mod clock;
pub mod error;
pub mod history;
pub mod mode;
pub mod scheduler;
pub mod trainer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{NavigationError, SessionError};
pub use history::NavigationHistory;
pub use mode::{CustomSession, CustomStats, DrillKind, SessionMode};
pub use scheduler::{AdvanceAction, AdvanceScheduler, AdvanceToken, PendingAdvance};
pub use trainer::{AnswerOutcome, CardPhase, ModeView, Snapshot, StageView, Trainer};
