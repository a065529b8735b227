//! Plain-text rendering of trainer state

use std::fmt::Write;

use textwrap::{Options, fill};

use crate::catalog::Category;
use crate::learning::{DailyGoal, StageState};
use crate::session::{AnswerOutcome, CardPhase, ModeView, Snapshot, Trainer};

/// Number of entries in the trouble list
pub const TROUBLE_LIMIT: usize = 5;

pub const HELP: &str = "\
Answer with the option number. Commands:
  :next, :prev          skip ahead or go back
  :goto <id>            jump to an item
  :filter <category>    toggle consonants, vowels, tones or words
  :flag, :unflag        mark the current card as unfamiliar
  :drill                drill the flagged items
  :focus <id> ...       drill a list of items
  :leave                stop the running drill
  :stats                stages, trouble items and today's progress
  :reset                forget all progress
  :quit";

fn wrapped(text: &str, width: usize, indent: &str) -> String {
    let options = Options::new(width).initial_indent(indent).subsequent_indent(indent);
    fill(text, options)
}

fn percent(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(accuracy) => format!("{:.0}%", accuracy * 100.0),
        None => "-".to_string(),
    }
}

fn stage_marker(state: StageState) -> &'static str {
    match state {
        StageState::Passed => "passed",
        StageState::Current => "current",
        StageState::Locked => "locked",
    }
}

/// Header line with mode, stage and today's counters
fn status_line(snapshot: &Snapshot) -> String {
    let mode = match &snapshot.mode {
        ModeView::Gated => snapshot
            .stages
            .iter()
            .find(|stage| stage.id == snapshot.current_stage)
            .map(|stage| stage.label.clone())
            .unwrap_or_else(|| "Practice".to_string()),
        ModeView::Custom { label, remaining, stats, .. } => {
            format!("{} ({} left, {} in a row)", label, remaining, stats.consecutive)
        }
    };

    let mut line = format!(
        "{} | today {} answered, {} | {} day streak",
        mode,
        snapshot.daily.attempts,
        percent(snapshot.daily.accuracy()),
        snapshot.day_streak
    );
    if snapshot.daily_goal_met {
        line.push_str(" | goal met");
    }
    line
}

/// The current card with its options
pub fn card(snapshot: &Snapshot, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", status_line(snapshot));

    let mastered =
        if snapshot.stats.is_mastered(snapshot.item.mastery_goal) { " mastered" } else { "" };
    let flag = if snapshot.flagged { "  [flagged]" } else { "" };
    let _ = writeln!(
        out,
        "\n  {}    {}  score {}/{}{}{}",
        snapshot.item.script,
        snapshot.category_label,
        snapshot.stats.score,
        snapshot.item.mastery_goal,
        mastered,
        flag
    );

    if snapshot.phase == CardPhase::Quiz {
        if let Some(hint) = &snapshot.item.hint {
            let _ = writeln!(out, "{}", wrapped(&format!("Hint: {}", hint), width, "  "));
        }
    }

    let _ = writeln!(out, "\n{}", wrapped(&snapshot.prompt, width, ""));
    for (i, option) in snapshot.options.iter().enumerate() {
        let _ = writeln!(out, "  {}) {}", i + 1, option);
    }
    out
}

/// Feedback after an answer
pub fn feedback(outcome: &AnswerOutcome, width: usize) -> String {
    let mut out = String::new();
    let item = &outcome.snapshot.item;

    if outcome.is_correct {
        let _ = writeln!(out, "Correct! {} is {}.", item.script, outcome.correct_answer);
        if item.speech() != item.script {
            let _ = writeln!(out, "  Say it: {}", item.speech());
        }
    } else {
        let _ = writeln!(out, "Not quite. The answer is {}.", outcome.correct_answer);
        if outcome.phase == CardPhase::Quiz {
            if let Some(mnemonic) = &item.mnemonic {
                let _ = writeln!(out, "{}", wrapped(mnemonic, width, "  "));
            }
        }
    }

    if !outcome.snapshot.breakdown.is_empty() {
        let _ = writeln!(out, "  Built from:");
        for part in &outcome.snapshot.breakdown {
            let _ = writeln!(out, "    {}  {}", part.script, part.transliteration);
        }
    }

    if outcome.flag_cleared {
        let _ = writeln!(out, "{} no longer looks unfamiliar, flag cleared.", item.script);
    }
    if let Some(advance) = &outcome.stage_advance {
        let label = |id: &str| {
            outcome
                .snapshot
                .stages
                .iter()
                .find(|stage| stage.id == id)
                .map(|stage| stage.label.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let _ = write!(out, "Stage passed: {}. ", label(&advance.passed));
        match &advance.unlocked {
            Some(next) => {
                let _ = writeln!(out, "Unlocked {}!", label(next));
            }
            None => {
                let _ = writeln!(out, "Every stage is open now!");
            }
        }
    }
    if let Some(label) = &outcome.session_completed {
        let _ = writeln!(out, "{} complete. Back to regular practice.", label);
    }
    if outcome.goal_just_met {
        let _ = writeln!(out, "Daily goal reached. Nice work!");
    }
    out
}

/// Stage progress, trouble items, flagged items and today's counters
pub fn stats(trainer: &Trainer) -> String {
    let snapshot = trainer.snapshot();
    let mut out = String::new();

    let _ = writeln!(out, "Stages");
    for stage in &snapshot.stages {
        let _ = writeln!(
            out,
            "  {:<24} {:<8} {:>4} answered  {:>4}  {} in a row",
            stage.label,
            stage_marker(stage.state),
            stage.stats.attempts,
            percent(stage.stats.accuracy()),
            stage.stats.consecutive
        );
    }
    if trainer.stage_gate().all_passed() {
        let _ = writeln!(out, "  Every stage passed");
    }

    let trouble = trainer.trouble_items(TROUBLE_LIMIT);
    let _ = writeln!(out, "\nTrouble items");
    if trouble.is_empty() {
        let _ = writeln!(out, "  Nothing attempted yet");
    }
    for entry in &trouble {
        let _ = writeln!(
            out,
            "  {:<8} {:<12} {:>4} over {} attempts",
            entry.item.script,
            entry.item.transliteration,
            percent(Some(entry.accuracy)),
            entry.stats.attempts
        );
    }

    let flagged = trainer.manual_items();
    let _ = writeln!(out, "\nFlagged as unfamiliar");
    if flagged.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for item in flagged {
        let _ = writeln!(out, "  {:<8} {}", item.script, item.transliteration);
    }

    let goal = trainer.daily_goal();
    let _ = writeln!(
        out,
        "\nToday: {}/{} answers at {} (goal {:.0}%), {} day streak",
        snapshot.daily.attempts,
        goal.attempts,
        percent(snapshot.daily.accuracy()),
        goal.accuracy,
        snapshot.day_streak
    );
    out
}

/// Every item grouped by category, with availability
pub fn items(trainer: &Trainer) -> String {
    let catalog = trainer.catalog();
    let gate = trainer.stage_gate();
    let mut out = String::new();

    for category in Category::ALL {
        let mut members = catalog.items_in(category).peekable();
        if members.peek().is_none() {
            continue;
        }
        let label = catalog.category_meta(category).map(|meta| meta.label.as_str()).unwrap_or("");
        let lock = if gate.is_allowed(category) { "" } else { " (locked)" };
        let _ = writeln!(out, "{}{}", label, lock);
        for item in members {
            let flag = if trainer.is_flagged(&item.id) { " *" } else { "" };
            let _ = writeln!(
                out,
                "  {:<18} {:<8} {}{}",
                item.id, item.script, item.transliteration, flag
            );
        }
    }
    out
}

/// Reminder shown once per day until the goal is met
pub fn reminder(goal: &DailyGoal) -> String {
    format!(
        "Today's goal: {} answers at {:.0}% accuracy or better.",
        goal.attempts, goal.accuracy
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::catalog::Catalog;
    use crate::config::{Config, Pacing};
    use crate::learning::ScriptedRandom;
    use crate::session::FixedClock;
    use crate::storage::{KeyValueStore, MemoryStore, STAGE_GATE_KEY};

    fn trainer() -> Trainer {
        trainer_over(MemoryStore::default())
    }

    fn trainer_over(store: MemoryStore) -> Trainer {
        let config = Config { pacing: Pacing::instant(), ..Default::default() };
        Trainer::new(
            Catalog::builtin().unwrap(),
            Box::new(store),
            Box::new(ScriptedRandom::constant(0.0)),
            Box::new(FixedClock(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())),
            &config,
        )
    }

    #[test]
    fn card_lists_numbered_options() {
        let trainer = trainer();
        let snapshot = trainer.snapshot();
        let text = card(&snapshot, 60);

        assert!(text.contains(&snapshot.item.script));
        assert!(text.starts_with("Stage 1: Consonants"));
        for (i, option) in snapshot.options.iter().enumerate() {
            assert!(text.contains(&format!("{}) {}", i + 1, option)));
        }
    }

    #[test]
    fn card_marks_mastered_items() {
        let trainer = trainer();
        let mut snapshot = trainer.snapshot();
        assert!(!card(&snapshot, 60).contains("mastered"));

        snapshot.stats.score = snapshot.item.mastery_goal;
        let expected = format!("score {0}/{0} mastered", snapshot.item.mastery_goal);
        assert!(card(&snapshot, 60).contains(&expected));
    }

    #[test]
    fn correct_feedback_spells_out_the_speech_text() {
        let mut trainer = trainer();
        let item = trainer.current_item().clone();
        assert_ne!(item.speech(), item.script);

        let outcome = trainer.submit_answer(&item.transliteration).unwrap();
        let text = feedback(&outcome, 60);
        assert!(text.contains(&format!("Say it: {}", item.speech())));
    }

    #[test]
    fn feedback_reports_the_right_answer() {
        let mut trainer = trainer();
        let outcome = trainer.submit_answer("definitely wrong").unwrap();
        let text = feedback(&outcome, 60);
        assert!(text.contains(&format!("The answer is {}", outcome.correct_answer)));
    }

    #[test]
    fn stats_show_every_stage() {
        let trainer = trainer();
        let text = stats(&trainer);
        for stage in trainer.catalog().stages() {
            assert!(text.contains(&stage.label));
        }
        assert!(text.contains("Nothing attempted yet"));
        assert!(!text.contains("Every stage passed"));
    }

    #[test]
    fn stats_celebrate_when_every_stage_is_passed() {
        let mut store = MemoryStore::default();
        let passed = r#"{"stats":{
            "stage-consonants":{"passed":true},
            "stage-vowels":{"passed":true},
            "stage-tones-words":{"passed":true}}}"#;
        store.set(STAGE_GATE_KEY, passed).unwrap();

        let text = stats(&trainer_over(store));
        assert!(text.contains("Every stage passed"));
    }

    #[test]
    fn items_mark_locked_categories() {
        let trainer = trainer();
        let text = items(&trainer);
        assert!(text.contains("k_kai"));
        assert!(text.contains("(locked)"));
    }
}
