//! Generation-tagged delayed transitions
//!
//! The trainer never sleeps. It hands the caller a [`PendingAdvance`] describing what
//! should happen after a delay; the caller waits and passes the token back. Showing
//! any other card in the meantime bumps the generation, so a late token is rejected
//! instead of advancing a card the learner has not answered.

use std::time::Duration;

/// Identifies one scheduled transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvanceToken(u64);

/// What to do when a pending transition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceAction {
    /// Draw and show the next card
    NextCard,
    /// Switch the current card to its mnemonic question
    ShowMnemonic,
    /// Return from the mnemonic question to the original question
    RetryQuiz,
}

/// A transition the caller should fire after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    pub token: AdvanceToken,
    pub action: AdvanceAction,
    pub delay: Duration,
}

/// Holds at most one pending transition
#[derive(Debug, Clone, Default)]
pub struct AdvanceScheduler {
    generation: u64,
    pending: Option<PendingAdvance>,
}

impl AdvanceScheduler {
    /// Schedule `action`, replacing anything already pending
    pub fn schedule(&mut self, action: AdvanceAction, delay: Duration) -> PendingAdvance {
        self.generation += 1;
        let pending = PendingAdvance { token: AdvanceToken(self.generation), action, delay };
        self.pending = Some(pending);
        pending
    }

    /// Invalidate whatever is pending
    pub fn supersede(&mut self) {
        self.generation += 1;
        if let Some(stale) = self.pending.take() {
            tracing::debug!(action = ?stale.action, "Superseded pending advance");
        }
    }

    /// Claim the action for `token` if it is still the live one
    pub fn take(&mut self, token: AdvanceToken) -> Option<AdvanceAction> {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                Some(pending.action)
            }
            _ => None,
        }
    }

    /// The live pending transition, if any
    pub fn pending(&self) -> Option<&PendingAdvance> {
        self.pending.as_ref()
    }
}
