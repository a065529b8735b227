//! Recoverable session errors
//!
//! These are expected outcomes of user actions (a stale link, an empty drill), not
//! faults. The trainer state is unchanged whenever one is returned.

use thiserror::Error;

use crate::catalog::Category;

/// Why a navigation request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// No item with this id exists
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The item's stage has not been unlocked yet
    #[error("{item_id} is locked until {stage_label} is unlocked")]
    StageLocked {
        /// Requested item
        item_id: String,
        /// Stage owning the item's category
        stage_id: String,
        /// Display label of that stage
        stage_label: String,
    },

    /// The item's category is switched off in the filter
    #[error("{item_id} is hidden by the {category} filter")]
    FilteredOut {
        /// Requested item
        item_id: String,
        /// The disabled category
        category: Category,
    },

    /// A focused session is running and the item is not part of it
    #[error("{0} is not part of the current drill")]
    OutsideSession(String),

    /// Already at the start of the history
    #[error("No earlier card to go back to")]
    NoHistory,

    /// History navigation only exists in normal practice
    #[error("Going back is not available during a drill")]
    HistoryUnavailable,
}

/// Why a session-level request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A drill was requested with nothing to practice
    #[error("Nothing to practice in {label}")]
    EmptyPool {
        /// Label of the drill that could not start
        label: String,
    },

    /// The current card has already been answered
    #[error("This card has already been answered")]
    AlreadyAnswered,

    /// No custom session is running
    #[error("No drill is running")]
    NotInDrill,
}

impl SessionError {
    /// Message suitable for showing to the learner as a warning
    pub fn user_message(&self) -> String {
        match self {
            SessionError::EmptyPool { label } => {
                format!("{} has no items yet. Flag or practice some items first.", label)
            }
            other => other.to_string(),
        }
    }
}
