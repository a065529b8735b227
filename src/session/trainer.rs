//! The trainer: one owner for every piece of mutable learning state

use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::{Catalog, Category, LearningItem};
use crate::config::{Config, Pacing};
use crate::learning::{
    DailyGoal, DailyProgress, RandomSource, StageAdvance, StageGate, StageState, StageStats,
    compute_weight, generate_options, pick_weighted_item, shuffle,
};
use crate::progress::{ItemStats, ManualFlags, ProgressStore, TroubleEntry};
use crate::storage::{
    DAILY_KEY, KeyValueStore, MANUAL_KEY, PROGRESS_KEY, Records, STAGE_GATE_KEY,
};

use super::clock::Clock;
use super::error::{NavigationError, SessionError};
use super::history::NavigationHistory;
use super::mode::{
    CustomSession, CustomStats, DRILL_CLEAR_STREAK, DrillKind, GATED_CLEAR_STREAK, SessionMode,
};
use super::scheduler::{AdvanceAction, AdvanceScheduler, AdvanceToken, PendingAdvance};

/// Label of the drill over manually flagged items
pub const UNFAMILIAR_DRILL_LABEL: &str = "Unfamiliar items";

const QUIZ_PROMPT: &str = "Choose the matching sound";
const WORD_PROMPT: &str = "How is this word romanized?";
const RETRY_PROMPT: &str = "Picture the mnemonic, then choose the sound again";

/// Which question the current card is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    /// Pick the transliteration
    Quiz,
    /// Pick the answer to the item's mnemonic question
    Mnemonic,
}

/// The card on screen
#[derive(Debug, Clone)]
struct Card {
    item_id: String,
    phase: CardPhase,
    options: Vec<String>,
    /// `Some(correct)` once answered
    answered: Option<bool>,
    /// Asked again after a successful mnemonic
    retry: bool,
    show_breakdown: bool,
}

impl Card {
    fn new(item_id: String, options: Vec<String>) -> Self {
        Self {
            item_id,
            phase: CardPhase::Quiz,
            options,
            answered: None,
            retry: false,
            show_breakdown: false,
        }
    }
}

/// One stage as the progress panel shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageView {
    pub id: String,
    pub label: String,
    pub categories: Vec<Category>,
    pub state: StageState,
    pub stats: StageStats,
}

/// Which session the learner is in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModeView {
    Gated,
    Custom { label: String, kind: DrillKind, remaining: usize, stats: CustomStats },
}

/// Everything a renderer needs to draw the current state
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub item: LearningItem,
    pub category_label: String,
    pub phase: CardPhase,
    pub prompt: String,
    pub options: Vec<String>,
    /// `Some(correct)` once the current question was answered
    pub answered: Option<bool>,
    pub stats: ItemStats,
    pub flagged: bool,
    /// Component items of a word, filled after a missed word
    pub breakdown: Vec<LearningItem>,
    pub stages: Vec<StageView>,
    pub current_stage: String,
    pub mode: ModeView,
    pub filters: Vec<Category>,
    pub daily: DailyProgress,
    pub daily_goal_met: bool,
    pub day_streak: u32,
    pub can_go_back: bool,
}

/// Result of answering the current question
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    /// The option that would have been right
    pub correct_answer: String,
    pub phase: CardPhase,
    /// Item stats after the answer (unchanged for mnemonic answers)
    pub stats: ItemStats,
    pub stage_advance: Option<StageAdvance>,
    /// Label of a custom session this answer completed
    pub session_completed: Option<String>,
    /// The item's manual flag was cleared by this answer
    pub flag_cleared: bool,
    /// This answer met the daily goal for the first time today
    pub goal_just_met: bool,
    /// The transition to fire after the feedback delay
    pub pending: PendingAdvance,
    pub snapshot: Snapshot,
}

/// Adaptive flashcard session over a catalog
pub struct Trainer {
    catalog: Catalog,
    records: Records,
    random: Box<dyn RandomSource>,
    clock: Box<dyn Clock>,
    daily_goal: DailyGoal,
    pacing: Pacing,
    progress: ProgressStore,
    flags: ManualFlags,
    gate: StageGate,
    daily: DailyProgress,
    mode: SessionMode,
    filters: BTreeSet<Category>,
    history: NavigationHistory,
    scheduler: AdvanceScheduler,
    card: Card,
}

impl Trainer {
    /// Restore persisted state from `store` and show the first card
    pub fn new(
        catalog: Catalog,
        store: Box<dyn KeyValueStore>,
        mut random: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
        config: &Config,
    ) -> Self {
        let records = Records::new(store);

        let progress = records
            .load(PROGRESS_KEY)
            .map(|value| ProgressStore::from_value(&value, &catalog))
            .unwrap_or_default();
        let flags = records
            .load(MANUAL_KEY)
            .map(|value| ManualFlags::from_value(&value, &catalog))
            .unwrap_or_default();
        let gate = match records.load(STAGE_GATE_KEY) {
            Some(value) => StageGate::from_value(catalog.stages().to_vec(), &value),
            None => StageGate::new(catalog.stages().to_vec()),
        };
        let mut daily =
            records.load(DAILY_KEY).map(|value| DailyProgress::from_value(&value)).unwrap_or_default();
        daily.roll_over(clock.today());

        let filters: BTreeSet<Category> = Category::ALL.into_iter().collect();
        let first_id = {
            let pool = gated_pool(&catalog, &gate, &filters);
            pick_weighted_item(
                &pool,
                None,
                |item| compute_weight(item, &progress.peek(&item.id), flags.contains(&item.id)),
                random.as_mut(),
            )
            .unwrap_or_else(|| catalog.default_item())
            .id
            .clone()
        };

        tracing::debug!(
            items = catalog.items().len(),
            tracked = progress.len(),
            flagged = flags.len(),
            stage = gate.current_stage_id(),
            "Trainer restored"
        );

        let mut trainer = Self {
            catalog,
            records,
            random,
            clock,
            daily_goal: config.daily_goal,
            pacing: config.pacing,
            progress,
            flags,
            gate,
            daily,
            mode: SessionMode::Gated,
            filters,
            history: NavigationHistory::starting_at(&first_id),
            scheduler: AdvanceScheduler::default(),
            card: Card::new(String::new(), Vec::new()),
        };
        trainer.show_card(&first_id, false);
        trainer
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn stage_gate(&self) -> &StageGate {
        &self.gate
    }

    pub fn daily(&self) -> &DailyProgress {
        &self.daily
    }

    pub fn daily_goal(&self) -> &DailyGoal {
        &self.daily_goal
    }

    /// Categories currently enabled in the filter
    pub fn filters(&self) -> &BTreeSet<Category> {
        &self.filters
    }

    /// The transition waiting to fire, if any
    pub fn pending(&self) -> Option<&PendingAdvance> {
        self.scheduler.pending()
    }

    /// The item on the current card
    pub fn current_item(&self) -> &LearningItem {
        self.catalog.get(&self.card.item_id).unwrap_or_else(|| self.catalog.default_item())
    }

    /// Stats for an item, creating a zeroed entry on first access
    pub fn stats_for(&mut self, id: &str) -> Option<ItemStats> {
        if !self.catalog.contains(id) {
            return None;
        }
        Some(*self.progress.get_stats(id))
    }

    pub fn is_flagged(&self, id: &str) -> bool {
        self.flags.contains(id)
    }

    /// Answer the current question with the chosen option text
    pub fn submit_answer(&mut self, selected: &str) -> Result<AnswerOutcome, SessionError> {
        if self.card.answered.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }
        let item = self.current_item().clone();

        match self.card.phase {
            CardPhase::Quiz => Ok(self.answer_quiz(&item, selected)),
            CardPhase::Mnemonic => Ok(self.answer_mnemonic(&item, selected)),
        }
    }

    fn answer_quiz(&mut self, item: &LearningItem, selected: &str) -> AnswerOutcome {
        let is_correct = selected == item.transliteration;
        self.card.answered = Some(is_correct);

        let stats = self.progress.record_result(item, is_correct);
        self.records.save(PROGRESS_KEY, &self.progress);

        let today = self.clock.today();
        let goal_was_met = self.daily.date == Some(today) && self.daily.is_goal_met(&self.daily_goal);
        self.daily.record_attempt(today, is_correct);
        let goal_just_met = !goal_was_met && self.daily.is_goal_met(&self.daily_goal);
        self.records.save(DAILY_KEY, &self.daily);
        if goal_just_met {
            tracing::info!(attempts = self.daily.attempts, "Daily goal met");
        }

        let mut stage_advance = None;
        let mut session_completed = None;
        let mut flag_cleared = false;
        match &mut self.mode {
            SessionMode::Custom(session) => {
                session.stats.record(is_correct);
                let run = session.record_item(&item.id, is_correct);
                if session.kind == DrillKind::Unfamiliar && run >= DRILL_CLEAR_STREAK {
                    session.remove(&item.id);
                    flag_cleared = self.flags.set(&item.id, false);
                }
                if session.stats.is_complete() {
                    session_completed = Some(session.label.clone());
                }
            }
            SessionMode::Gated => {
                stage_advance = self.gate.update(item.category, is_correct);
                self.records.save(STAGE_GATE_KEY, &self.gate.record());
                if is_correct && stats.streak >= GATED_CLEAR_STREAK {
                    flag_cleared = self.flags.set(&item.id, false);
                }
            }
        }

        if flag_cleared {
            tracing::debug!(item = %item.id, streak = stats.streak, "Manual flag cleared");
            self.records.save(MANUAL_KEY, &self.flags);
        }
        if let Some(label) = &session_completed {
            tracing::info!(%label, "Drill completed");
            self.mode = SessionMode::Gated;
        }

        let pending = if is_correct {
            self.scheduler.schedule(AdvanceAction::NextCard, self.pacing.correct())
        } else {
            self.card.show_breakdown = item.category == Category::Word && !item.breakdown.is_empty();
            if item.mnemonic_question.is_some() {
                self.scheduler.schedule(AdvanceAction::ShowMnemonic, self.pacing.mnemonic())
            } else {
                self.scheduler.schedule(AdvanceAction::NextCard, self.pacing.incorrect())
            }
        };

        AnswerOutcome {
            is_correct,
            correct_answer: item.transliteration.clone(),
            phase: CardPhase::Quiz,
            stats,
            stage_advance,
            session_completed,
            flag_cleared,
            goal_just_met,
            pending,
            snapshot: self.snapshot(),
        }
    }

    fn answer_mnemonic(&mut self, item: &LearningItem, selected: &str) -> AnswerOutcome {
        let correct_answer =
            item.mnemonic_question.as_ref().map(|question| question.answer.clone()).unwrap_or_default();
        let is_correct = selected == correct_answer;
        self.card.answered = Some(is_correct);

        let pending = if is_correct {
            self.scheduler.schedule(AdvanceAction::RetryQuiz, self.pacing.retry())
        } else {
            self.scheduler.schedule(AdvanceAction::NextCard, self.pacing.mnemonic_miss())
        };

        AnswerOutcome {
            is_correct,
            correct_answer,
            phase: CardPhase::Mnemonic,
            stats: self.progress.peek(&item.id),
            stage_advance: None,
            session_completed: None,
            flag_cleared: false,
            goal_just_met: false,
            pending,
            snapshot: self.snapshot(),
        }
    }

    /// Fire a pending transition; stale tokens are ignored and return `None`
    pub fn fire_pending(&mut self, token: AdvanceToken) -> Option<Snapshot> {
        let Some(action) = self.scheduler.take(token) else {
            tracing::debug!(?token, "Ignoring stale advance");
            return None;
        };

        match action {
            AdvanceAction::NextCard => self.select_next(),
            AdvanceAction::ShowMnemonic => {
                let question = self.current_item().mnemonic_question.clone();
                match question {
                    Some(question) => {
                        let mut options = question.options;
                        shuffle(self.random.as_mut(), &mut options);
                        self.card.phase = CardPhase::Mnemonic;
                        self.card.options = options;
                        self.card.answered = None;
                    }
                    None => self.select_next(),
                }
            }
            AdvanceAction::RetryQuiz => {
                let options = self.options_for(&self.card.item_id.clone());
                self.card.phase = CardPhase::Quiz;
                self.card.options = options;
                self.card.answered = None;
                self.card.retry = true;
            }
        }
        Some(self.snapshot())
    }

    /// Skip to the next card right away
    pub fn request_next(&mut self) -> Snapshot {
        self.select_next();
        self.snapshot()
    }

    /// Go back to the previously shown card
    pub fn request_previous(&mut self) -> Result<Snapshot, NavigationError> {
        if self.mode.is_custom() {
            return Err(NavigationError::HistoryUnavailable);
        }
        let id = self.history.peek_back().ok_or(NavigationError::NoHistory)?.to_string();
        if let Some(item) = self.catalog.get(&id) {
            self.check_navigable(item)?;
        }
        self.history.back();
        self.show_card(&id, false);
        Ok(self.snapshot())
    }

    /// Reject items whose stage is locked or whose category is filtered out
    fn check_navigable(&self, item: &LearningItem) -> Result<(), NavigationError> {
        if !self.gate.is_allowed(item.category) {
            let (stage_id, stage_label) = self
                .gate
                .stage_of(item.category)
                .map(|stage| (stage.id.clone(), stage.label.clone()))
                .unwrap_or_default();
            return Err(NavigationError::StageLocked {
                item_id: item.id.clone(),
                stage_id,
                stage_label,
            });
        }
        if !self.filters.contains(&item.category) {
            return Err(NavigationError::FilteredOut {
                item_id: item.id.clone(),
                category: item.category,
            });
        }
        Ok(())
    }

    /// Jump straight to an item
    pub fn go_to_item(&mut self, id: &str) -> Result<Snapshot, NavigationError> {
        let item =
            self.catalog.get(id).ok_or_else(|| NavigationError::UnknownItem(id.to_string()))?;

        match &self.mode {
            SessionMode::Custom(session) => {
                if !session.contains(id) {
                    return Err(NavigationError::OutsideSession(id.to_string()));
                }
            }
            SessionMode::Gated => self.check_navigable(item)?,
        }

        self.show_card(id, true);
        Ok(self.snapshot())
    }

    /// Switch a category on or off; turning off the last one re-enables all
    pub fn toggle_category_filter(&mut self, category: Category) -> Snapshot {
        if !self.filters.remove(&category) {
            self.filters.insert(category);
        }
        if self.filters.is_empty() {
            tracing::debug!("Filter emptied, enabling every category");
            self.filters.extend(Category::ALL);
        }

        if !self.mode.is_custom() && !self.filters.contains(&self.current_item().category) {
            self.select_next();
        }
        self.snapshot()
    }

    /// Mark or unmark an item as unfamiliar
    pub fn set_manual_flag(&mut self, id: &str, flagged: bool) -> Result<Snapshot, NavigationError> {
        if !self.catalog.contains(id) {
            return Err(NavigationError::UnknownItem(id.to_string()));
        }
        if self.flags.set(id, flagged) {
            self.records.save(MANUAL_KEY, &self.flags);
        }
        if !flagged {
            if let Some(session) = self.mode.custom_mut() {
                if session.kind == DrillKind::Unfamiliar {
                    session.remove(id);
                }
            }
        }
        Ok(self.snapshot())
    }

    /// Start a drill over an explicit list of item ids
    ///
    /// Unknown ids are dropped and duplicates collapsed. Fails without changing
    /// anything when no usable id remains.
    pub fn start_focused_drill<I, S>(&mut self, ids: I, label: &str) -> Result<Snapshot, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.start_custom_session(ids, label, DrillKind::Focused)
    }

    /// Start a drill over every manually flagged item
    pub fn start_unfamiliar_drill(&mut self) -> Result<Snapshot, SessionError> {
        let ids: Vec<String> =
            self.flags.sorted_items(&self.catalog).iter().map(|item| item.id.clone()).collect();
        self.start_custom_session(ids, UNFAMILIAR_DRILL_LABEL, DrillKind::Unfamiliar)
    }

    fn start_custom_session<I, S>(
        &mut self,
        ids: I,
        label: &str,
        kind: DrillKind,
    ) -> Result<Snapshot, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !self.catalog.contains(id) {
                tracing::warn!(id, "Skipping unknown item in drill");
                continue;
            }
            if !pool.iter().any(|existing| existing == id) {
                pool.push(id.to_string());
            }
        }

        if pool.is_empty() {
            tracing::warn!(label, "Refusing to start an empty drill");
            return Err(SessionError::EmptyPool { label: label.to_string() });
        }

        let start = pool[self.random.pick_index(pool.len())].clone();
        tracing::info!(label, items = pool.len(), ?kind, "Drill started");
        self.mode = SessionMode::Custom(CustomSession::new(label, kind, pool));
        self.show_card(&start, false);
        Ok(self.snapshot())
    }

    /// Abandon the running drill and return to normal practice
    pub fn leave_custom_session(&mut self) -> Result<Snapshot, SessionError> {
        if !self.mode.is_custom() {
            return Err(SessionError::NotInDrill);
        }
        self.mode = SessionMode::Gated;
        self.select_next();
        Ok(self.snapshot())
    }

    /// Forget all item stats and stage progress
    ///
    /// Manual flags and the daily tracker are kept.
    pub fn reset_all_progress(&mut self) -> Snapshot {
        self.progress.reset();
        self.gate.reset();
        self.mode = SessionMode::Gated;
        self.records.save(PROGRESS_KEY, &self.progress);
        self.records.save(STAGE_GATE_KEY, &self.gate.record());
        tracing::info!("Progress reset");

        self.select_next();
        self.history = NavigationHistory::starting_at(&self.card.item_id);
        self.snapshot()
    }

    /// Attempted items with the worst accuracy first
    pub fn trouble_items(&self, limit: usize) -> Vec<TroubleEntry<'_>> {
        self.progress.trouble_items(&self.catalog, limit)
    }

    /// Manually flagged items in catalog order
    pub fn manual_items(&self) -> Vec<&LearningItem> {
        self.flags.sorted_items(&self.catalog)
    }

    /// Whether to show the daily goal reminder; marks it shown for today
    pub fn take_daily_reminder(&mut self) -> bool {
        let today = self.clock.today();
        if !self.daily.should_remind(today, &self.daily_goal) {
            return false;
        }
        self.daily.mark_reminded(today);
        self.records.save(DAILY_KEY, &self.daily);
        true
    }

    /// Current view of everything
    pub fn snapshot(&self) -> Snapshot {
        let item = self.current_item();
        let today = self.clock.today();
        let mut daily = self.daily.clone();
        daily.roll_over(today);

        let prompt = match self.card.phase {
            CardPhase::Mnemonic => item
                .mnemonic_question
                .as_ref()
                .map(|question| question.prompt.clone())
                .unwrap_or_default(),
            CardPhase::Quiz if self.card.retry => RETRY_PROMPT.to_string(),
            CardPhase::Quiz if item.category == Category::Word => WORD_PROMPT.to_string(),
            CardPhase::Quiz => QUIZ_PROMPT.to_string(),
        };

        let breakdown = if self.card.show_breakdown {
            self.catalog.breakdown_of(item).into_iter().cloned().collect()
        } else {
            Vec::new()
        };

        let stages = self
            .gate
            .stages()
            .iter()
            .map(|stage| StageView {
                id: stage.id.clone(),
                label: stage.label.clone(),
                categories: stage.categories.clone(),
                state: self.gate.state(&stage.id).unwrap_or(StageState::Locked),
                stats: self.gate.stats(&stage.id),
            })
            .collect();

        let mode = match &self.mode {
            SessionMode::Gated => ModeView::Gated,
            SessionMode::Custom(session) => ModeView::Custom {
                label: session.label.clone(),
                kind: session.kind,
                remaining: session.pool().len(),
                stats: session.stats,
            },
        };

        Snapshot {
            item: item.clone(),
            category_label: self
                .catalog
                .category_meta(item.category)
                .map(|meta| meta.label.clone())
                .unwrap_or_else(|| item.category.to_string()),
            phase: self.card.phase,
            prompt,
            options: self.card.options.clone(),
            answered: self.card.answered,
            stats: self.progress.peek(&item.id),
            flagged: self.flags.contains(&item.id),
            breakdown,
            stages,
            current_stage: self.gate.current_stage_id().to_string(),
            mode,
            filters: self.filters.iter().copied().collect(),
            daily_goal_met: daily.is_goal_met(&self.daily_goal),
            day_streak: daily.current_streak(today),
            daily,
            can_go_back: !self.mode.is_custom() && self.history.can_go_back(),
        }
    }

    /// Draw the next card from the active pool
    fn select_next(&mut self) {
        if self.mode.custom().is_some_and(CustomSession::is_exhausted) {
            tracing::info!("Drill pool exhausted, returning to normal practice");
            self.mode = SessionMode::Gated;
        }

        let next_id = {
            let pool: Vec<&LearningItem> = match &self.mode {
                SessionMode::Custom(session) => {
                    session.pool().iter().filter_map(|id| self.catalog.get(id)).collect()
                }
                SessionMode::Gated => gated_pool(&self.catalog, &self.gate, &self.filters),
            };
            let progress = &self.progress;
            let flags = &self.flags;
            pick_weighted_item(
                &pool,
                Some(self.card.item_id.as_str()),
                |item| compute_weight(item, &progress.peek(&item.id), flags.contains(&item.id)),
                self.random.as_mut(),
            )
            .unwrap_or_else(|| self.catalog.default_item())
            .id
            .clone()
        };

        let push_history = !self.mode.is_custom();
        self.show_card(&next_id, push_history);
    }

    /// Put an item on screen as a fresh quiz question
    fn show_card(&mut self, id: &str, push_history: bool) {
        self.scheduler.supersede();
        let options = self.options_for(id);
        self.card = Card::new(id.to_string(), options);
        if push_history {
            self.history.push(id);
        }
        tracing::debug!(item = id, "Showing card");
    }

    /// Stages unlock whole categories, so an item's same-category siblings are always
    /// as available as the item itself.
    fn options_for(&mut self, id: &str) -> Vec<String> {
        let Some(item) = self.catalog.get(id) else {
            return Vec::new();
        };
        let candidates: Vec<&LearningItem> = self.catalog.items_in(item.category).collect();
        generate_options(item, &candidates, self.random.as_mut())
    }
}

/// Allowed and filtered items, falling back to allowed only, then to everything
fn gated_pool<'a>(
    catalog: &'a Catalog,
    gate: &StageGate,
    filters: &BTreeSet<Category>,
) -> Vec<&'a LearningItem> {
    let allowed = gate.allowed_categories();

    let filtered: Vec<&LearningItem> = catalog
        .items()
        .iter()
        .filter(|item| allowed.contains(&item.category) && filters.contains(&item.category))
        .collect();
    if !filtered.is_empty() {
        return filtered;
    }

    let unfiltered: Vec<&LearningItem> =
        catalog.items().iter().filter(|item| allowed.contains(&item.category)).collect();
    if !unfiltered.is_empty() {
        return unfiltered;
    }

    catalog.items().iter().collect()
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::catalog::MnemonicQuestion;
    use crate::catalog::store::fixtures::{self, item, stages};
    use crate::learning::{ScriptedRandom, SeededRandom};
    use crate::session::clock::FixedClock;
    use crate::storage::{MemoryStore, StorageError};

    /// A store the test can still inspect after handing it to the trainer
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl SharedStore {
        fn record(&self, key: &str) -> Option<Value> {
            let raw = self.0.borrow().get(key).ok().flatten()?;
            serde_json::from_str(&raw).ok()
        }
    }

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().remove(key)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn config() -> Config {
        Config { pacing: Pacing::instant(), ..Default::default() }
    }

    fn trainer_with(catalog: Catalog, store: Box<dyn KeyValueStore>) -> Trainer {
        Trainer::new(
            catalog,
            store,
            Box::new(SeededRandom::from_seed(7)),
            Box::new(FixedClock(today())),
            &config(),
        )
    }

    fn trainer() -> (Trainer, SharedStore) {
        let store = SharedStore::default();
        (trainer_with(fixtures::catalog(), Box::new(store.clone())), store)
    }

    /// Answer the current card correctly and fire the follow-up
    fn answer_right(trainer: &mut Trainer) -> AnswerOutcome {
        let answer = trainer.current_item().transliteration.clone();
        let outcome = trainer.submit_answer(&answer).unwrap();
        trainer.fire_pending(outcome.pending.token);
        outcome
    }

    fn catalog_with_mnemonic() -> Catalog {
        let mut a = item("a", Category::Consonant, "ah");
        a.mnemonic_question = Some(MnemonicQuestion {
            prompt: "What does the glyph look like?".to_string(),
            options: vec!["chicken".to_string(), "egg".to_string(), "buffalo".to_string()],
            answer: "chicken".to_string(),
        });
        let b = item("b", Category::Consonant, "bee");
        let categories = fixtures::catalog().categories().to_vec();
        Catalog::new(categories, stages(), vec![a, b]).unwrap()
    }

    #[test]
    fn first_card_comes_from_the_first_stage() {
        let (trainer, _) = trainer();
        let snapshot = trainer.snapshot();
        assert_eq!(snapshot.item.category, Category::Consonant);
        assert_eq!(snapshot.phase, CardPhase::Quiz);
        assert_eq!(snapshot.options.len(), 3);
        assert!(snapshot.options.contains(&snapshot.item.transliteration));
        assert_eq!(snapshot.current_stage, "s1");
        assert_eq!(snapshot.mode, ModeView::Gated);
    }

    #[test]
    fn gated_pool_never_leaves_unlocked_stages() {
        let (mut trainer, _) = trainer();
        for _ in 0..50 {
            assert_eq!(trainer.request_next().item.category, Category::Consonant);
        }
    }

    #[test]
    fn correct_answer_updates_and_persists_stats() {
        let (mut trainer, store) = trainer();
        let id = trainer.current_item().id.clone();
        let outcome = answer_right(&mut trainer);

        assert!(outcome.is_correct);
        assert_eq!(outcome.stats.correct, 1);
        assert_eq!(outcome.stats.score, 1);
        assert_eq!(outcome.pending.action, AdvanceAction::NextCard);

        let saved = store.record(PROGRESS_KEY).unwrap();
        assert_eq!(saved[&id]["correct"], json!(1));
        assert_eq!(store.record(STAGE_GATE_KEY).unwrap()["stats"]["s1"]["attempts"], json!(1));
        assert_eq!(store.record(DAILY_KEY).unwrap()["attempts"], json!(1));
    }

    #[test]
    fn second_answer_on_same_card_is_rejected() {
        let (mut trainer, _) = trainer();
        trainer.submit_answer("nope").unwrap();
        assert_eq!(trainer.submit_answer("nope").unwrap_err(), SessionError::AlreadyAnswered);
        assert_eq!(trainer.stats_for(&trainer.current_item().id.clone()).unwrap().attempts, 1);
    }

    #[test]
    fn stale_token_does_not_advance() {
        let (mut trainer, _) = trainer();
        let outcome = trainer.submit_answer("nope").unwrap();

        let skipped = trainer.request_next();
        assert!(trainer.fire_pending(outcome.pending.token).is_none());
        assert_eq!(trainer.snapshot().item.id, skipped.item.id);
        assert_eq!(trainer.snapshot().answered, None);
    }

    #[test]
    fn ten_in_a_row_unlocks_the_next_stage() {
        let (mut trainer, _) = trainer();
        let mut advance = None;
        for _ in 0..10 {
            advance = answer_right(&mut trainer).stage_advance.or(advance);
        }

        assert_eq!(
            advance,
            Some(StageAdvance { passed: "s1".to_string(), unlocked: Some("s2".to_string()) })
        );
        assert_eq!(trainer.snapshot().current_stage, "s2");
        assert!(trainer.go_to_item("e").is_ok());
    }

    #[test]
    fn locked_item_navigation_is_refused() {
        let (mut trainer, _) = trainer();
        let before = trainer.snapshot().item.id;

        let err = trainer.go_to_item("g").unwrap_err();
        assert_eq!(
            err,
            NavigationError::StageLocked {
                item_id: "g".to_string(),
                stage_id: "s3".to_string(),
                stage_label: "Tones & Words".to_string(),
            }
        );
        assert_eq!(trainer.snapshot().item.id, before);
        assert_eq!(
            trainer.go_to_item("zzz").unwrap_err(),
            NavigationError::UnknownItem("zzz".to_string())
        );
    }

    #[test]
    fn custom_session_completes_and_returns_to_gated() {
        let (mut trainer, _) = trainer();
        trainer.start_focused_drill(["a", "b"], "Pair drill").unwrap();

        let mut completed = None;
        for _ in 0..10 {
            let id = trainer.current_item().id.clone();
            assert!(id == "a" || id == "b", "drew {} outside the drill", id);
            if let Some(label) = answer_right(&mut trainer).session_completed {
                completed = Some(label);
            }
        }

        assert_eq!(completed, Some("Pair drill".to_string()));
        assert_eq!(trainer.snapshot().mode, ModeView::Gated);
    }

    #[test]
    fn custom_session_does_not_touch_the_stage_gate() {
        let (mut trainer, _) = trainer();
        trainer.start_focused_drill(["a"], "Solo").unwrap();
        answer_right(&mut trainer);
        assert_eq!(trainer.stage_gate().stats("s1").attempts, 0);
    }

    #[test]
    fn empty_drill_is_refused_without_state_change() {
        let (mut trainer, _) = trainer();
        let before = trainer.snapshot().item.id;

        let err = trainer.start_focused_drill(["nope"], "Ghosts").unwrap_err();
        assert_eq!(err, SessionError::EmptyPool { label: "Ghosts".to_string() });
        assert_eq!(trainer.start_unfamiliar_drill().unwrap_err(), SessionError::EmptyPool {
            label: UNFAMILIAR_DRILL_LABEL.to_string()
        });
        assert!(!trainer.mode().is_custom());
        assert_eq!(trainer.snapshot().item.id, before);
    }

    #[test]
    fn drill_rejects_items_outside_its_pool() {
        let (mut trainer, _) = trainer();
        trainer.start_focused_drill(["a", "a", "b"], "Pair").unwrap();
        assert_eq!(
            trainer.go_to_item("c").unwrap_err(),
            NavigationError::OutsideSession("c".to_string())
        );
        assert_eq!(trainer.request_previous().unwrap_err(), NavigationError::HistoryUnavailable);
        match trainer.snapshot().mode {
            ModeView::Custom { remaining, .. } => assert_eq!(remaining, 2),
            ModeView::Gated => panic!("expected a drill"),
        }
    }

    #[test]
    fn unfamiliar_drill_drops_items_that_stick() {
        let (mut trainer, store) = trainer();
        trainer.set_manual_flag("a", true).unwrap();
        trainer.start_unfamiliar_drill().unwrap();
        assert_eq!(trainer.current_item().id, "a");

        for _ in 0..DRILL_CLEAR_STREAK {
            answer_right(&mut trainer);
        }

        assert!(!trainer.is_flagged("a"));
        assert_eq!(store.record(MANUAL_KEY), Some(json!([])));
        assert!(!trainer.mode().is_custom());
    }

    #[test]
    fn unfamiliar_drill_counts_only_hits_inside_the_drill() {
        let (mut trainer, _) = trainer();
        trainer.set_manual_flag("a", true).unwrap();
        for _ in 0..2 {
            trainer.go_to_item("a").unwrap();
            answer_right(&mut trainer);
        }
        assert_eq!(trainer.stats_for("a").unwrap().streak, 2);

        trainer.start_unfamiliar_drill().unwrap();
        let outcome = answer_right(&mut trainer);
        assert!(!outcome.flag_cleared);
        assert!(trainer.is_flagged("a"));
        assert!(trainer.mode().is_custom());

        let miss = trainer.submit_answer("wrong").unwrap();
        trainer.fire_pending(miss.pending.token);
        for _ in 0..2 {
            let outcome = trainer.submit_answer("ah").unwrap();
            trainer.fire_pending(outcome.pending.token);
        }
        assert!(trainer.is_flagged("a"));

        let outcome = trainer.submit_answer("ah").unwrap();
        assert!(outcome.flag_cleared);
        assert!(!trainer.is_flagged("a"));
        assert!(!trainer.mode().is_custom());
    }

    #[test]
    fn long_streak_in_practice_clears_flag() {
        let (mut trainer, _) = trainer();
        let id = trainer.current_item().id.clone();
        trainer.set_manual_flag(&id, true).unwrap();

        for _ in 0..GATED_CLEAR_STREAK {
            trainer.go_to_item(&id).unwrap();
            let answer = trainer.current_item().transliteration.clone();
            trainer.submit_answer(&answer).unwrap();
        }
        assert!(!trainer.is_flagged(&id));
    }

    #[test]
    fn leaving_a_drill_returns_to_practice() {
        let (mut trainer, _) = trainer();
        assert_eq!(trainer.leave_custom_session().unwrap_err(), SessionError::NotInDrill);
        trainer.start_focused_drill(["b"], "One").unwrap();
        let snapshot = trainer.leave_custom_session().unwrap();
        assert_eq!(snapshot.mode, ModeView::Gated);
    }

    #[test]
    fn previous_walks_history_in_practice() {
        let (mut trainer, _) = trainer();
        let first = trainer.snapshot().item.id;
        trainer.go_to_item("d").unwrap();

        assert_eq!(trainer.request_previous().unwrap().item.id, first);
        assert_eq!(trainer.request_previous().unwrap_err(), NavigationError::NoHistory);
    }

    #[test]
    fn previous_refuses_filtered_out_items() {
        let store = SharedStore::default();
        store.0.borrow_mut().set(STAGE_GATE_KEY, r#"{"stats":{"s1":{"passed":true}}}"#).unwrap();
        let mut trainer = trainer_with(fixtures::catalog(), Box::new(store));
        trainer.go_to_item("a").unwrap();
        trainer.go_to_item("e").unwrap();
        trainer.toggle_category_filter(Category::Consonant);

        assert_eq!(
            trainer.request_previous().unwrap_err(),
            NavigationError::FilteredOut { item_id: "a".to_string(), category: Category::Consonant }
        );
        let snapshot = trainer.snapshot();
        assert_eq!(snapshot.item.id, "e");
        assert!(snapshot.can_go_back);

        trainer.toggle_category_filter(Category::Consonant);
        assert_eq!(trainer.request_previous().unwrap().item.id, "a");
    }

    #[test]
    fn emptying_the_filter_enables_everything() {
        let (mut trainer, _) = trainer();
        let snapshot = trainer.toggle_category_filter(Category::Consonant);
        // nothing allowed survives the filter, so practice falls back to the stage
        assert_eq!(snapshot.item.category, Category::Consonant);
        assert!(!snapshot.filters.contains(&Category::Consonant));
        assert_eq!(
            trainer.go_to_item("b").unwrap_err(),
            NavigationError::FilteredOut { item_id: "b".to_string(), category: Category::Consonant }
        );

        for category in [Category::Vowel, Category::Tone, Category::Word] {
            trainer.toggle_category_filter(category);
        }
        assert_eq!(trainer.filters().len(), Category::ALL.len());
    }

    #[test]
    fn reset_keeps_flags_and_daily() {
        let (mut trainer, store) = trainer();
        trainer.set_manual_flag("e", true).unwrap();
        for _ in 0..10 {
            answer_right(&mut trainer);
        }
        assert_eq!(trainer.snapshot().current_stage, "s2");

        let snapshot = trainer.reset_all_progress();
        assert_eq!(snapshot.current_stage, "s1");
        assert_eq!(snapshot.item.category, Category::Consonant);
        assert_eq!(store.record(PROGRESS_KEY), Some(json!({})));
        assert!(trainer.is_flagged("e"));
        assert_eq!(trainer.daily().attempts, 10);
        assert!(!snapshot.can_go_back);
    }

    #[test]
    fn missed_item_goes_through_its_mnemonic() {
        let store = SharedStore::default();
        let mut trainer = Trainer::new(
            catalog_with_mnemonic(),
            Box::new(store),
            Box::new(ScriptedRandom::constant(0.0)),
            Box::new(FixedClock(today())),
            &config(),
        );
        trainer.go_to_item("a").unwrap();

        let miss = trainer.submit_answer("bee").unwrap();
        assert_eq!(miss.pending.action, AdvanceAction::ShowMnemonic);
        let mnemonic = trainer.fire_pending(miss.pending.token).unwrap();
        assert_eq!(mnemonic.phase, CardPhase::Mnemonic);
        assert_eq!(mnemonic.prompt, "What does the glyph look like?");

        let recall = trainer.submit_answer("chicken").unwrap();
        assert_eq!(recall.pending.action, AdvanceAction::RetryQuiz);
        assert_eq!(recall.stats.attempts, 1);

        let retry = trainer.fire_pending(recall.pending.token).unwrap();
        assert_eq!(retry.item.id, "a");
        assert_eq!(retry.phase, CardPhase::Quiz);
        assert_eq!(retry.prompt, RETRY_PROMPT);
    }

    #[test]
    fn missed_word_shows_its_breakdown() {
        let mut word = item("w", Category::Word, "sa wat dee");
        word.breakdown = vec!["a".to_string(), "b".to_string()];
        let categories = fixtures::catalog().categories().to_vec();
        let catalog = Catalog::new(
            categories,
            stages(),
            vec![item("a", Category::Consonant, "ah"), item("b", Category::Consonant, "bee"), word],
        )
        .unwrap();
        let store = SharedStore::default();
        store
            .0
            .borrow_mut()
            .set(
                STAGE_GATE_KEY,
                r#"{"stats":{"s1":{"passed":true},"s2":{"passed":true}}}"#,
            )
            .unwrap();
        let mut trainer = trainer_with(catalog, Box::new(store));

        let snapshot = trainer.go_to_item("w").unwrap();
        assert_eq!(snapshot.prompt, WORD_PROMPT);
        let outcome = trainer.submit_answer("wrong").unwrap();
        let parts: Vec<String> = outcome.snapshot.breakdown.iter().map(|i| i.id.clone()).collect();
        assert_eq!(parts, vec!["a", "b"]);
    }

    #[test]
    fn state_survives_a_restart() {
        let store = SharedStore::default();
        let mut first = trainer_with(fixtures::catalog(), Box::new(store.clone()));
        first.set_manual_flag("b", true).unwrap();
        for _ in 0..3 {
            answer_right(&mut first);
        }

        let mut second = trainer_with(fixtures::catalog(), Box::new(store));
        assert!(second.is_flagged("b"));
        assert_eq!(second.daily().attempts, 3);
        assert_eq!(second.stage_gate().stats("s1").consecutive, 3);
        let total: u32 = ["a", "b", "c", "d"]
            .iter()
            .map(|id| second.stats_for(id).unwrap().correct)
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn storage_failures_do_not_stop_practice() {
        let store = MemoryStore::default().with_failing_writes();
        let mut trainer = trainer_with(fixtures::catalog(), Box::new(store));
        let outcome = answer_right(&mut trainer);
        assert!(outcome.is_correct);
        assert_eq!(outcome.stats.correct, 1);

        let unreadable = MemoryStore::default().with_failing_reads();
        let trainer = trainer_with(fixtures::catalog(), Box::new(unreadable));
        assert_eq!(trainer.snapshot().current_stage, "s1");
    }

    #[test]
    fn corrupt_records_are_ignored() {
        let store = SharedStore::default();
        store.0.borrow_mut().set(PROGRESS_KEY, "{not json").unwrap();
        store.0.borrow_mut().set(MANUAL_KEY, r#"["a", 5, "ghost"]"#).unwrap();
        let mut trainer = trainer_with(fixtures::catalog(), Box::new(store));

        assert_eq!(trainer.stats_for("a"), Some(ItemStats::default()));
        assert!(trainer.is_flagged("a"));
        assert_eq!(trainer.manual_items().len(), 1);
    }

    /// A clock the test can move forward
    #[derive(Clone)]
    struct StepClock(Rc<Cell<NaiveDate>>);

    impl Clock for StepClock {
        fn today(&self) -> NaiveDate {
            self.0.get()
        }
    }

    #[test]
    fn snapshot_starts_a_fresh_day_after_midnight() {
        let clock = StepClock(Rc::new(Cell::new(today())));
        let mut trainer = Trainer::new(
            fixtures::catalog(),
            Box::new(MemoryStore::default()),
            Box::new(SeededRandom::from_seed(7)),
            Box::new(clock.clone()),
            &Config { daily_goal: DailyGoal { attempts: 1, accuracy: 0.0 }, ..config() },
        );
        answer_right(&mut trainer);
        assert_eq!(trainer.snapshot().daily.attempts, 1);
        assert!(trainer.snapshot().daily_goal_met);

        clock.0.set(today().succ_opt().unwrap());
        let snapshot = trainer.snapshot();
        assert_eq!(snapshot.daily.attempts, 0);
        assert_eq!(snapshot.daily.date, Some(today().succ_opt().unwrap()));
        assert!(!snapshot.daily_goal_met);
        assert_eq!(snapshot.day_streak, 1);
    }

    #[test]
    fn daily_reminder_shows_once() {
        let (mut trainer, store) = trainer();
        assert!(trainer.take_daily_reminder());
        assert!(!trainer.take_daily_reminder());
        assert_eq!(store.record(DAILY_KEY).unwrap()["reminderDate"], json!("2024-05-01"));
    }

    #[test]
    fn trouble_list_ranks_misses_first() {
        let (mut trainer, _) = trainer();
        trainer.go_to_item("c").unwrap();
        trainer.submit_answer("wrong").unwrap();
        trainer.go_to_item("d").unwrap();
        trainer.submit_answer("dee").unwrap();

        let trouble: Vec<&str> =
            trainer.trouble_items(5).iter().map(|entry| entry.item.id.as_str()).collect();
        assert_eq!(trouble.first(), Some(&"c"));
    }
}
