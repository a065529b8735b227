//! Daily practice tracking
//!
//! Independent from item-level stats: counts today's attempts, the run of
//! consecutive practice days, and whether today's goal has been reached.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current layout of [`DailyProgress`]
pub const DAILY_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What counts as a finished day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyGoal {
    /// Minimum answers per day
    pub attempts: u32,
    /// Minimum accuracy, in percent
    pub accuracy: f64,
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self { attempts: 30, accuracy: 70.0 }
    }
}

/// Today's counters plus the day streak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub version: u32,
    /// Day the counters belong to
    pub date: Option<NaiveDate>,
    pub attempts: u32,
    pub correct: u32,
    /// Consecutive days with at least one answer
    pub streak: u32,
    pub last_practice_date: Option<NaiveDate>,
    /// Last day the goal reminder was shown
    pub reminder_date: Option<NaiveDate>,
}

impl Default for DailyProgress {
    fn default() -> Self {
        Self {
            version: DAILY_VERSION,
            date: None,
            attempts: 0,
            correct: 0,
            streak: 0,
            last_practice_date: None,
            reminder_date: None,
        }
    }
}

impl DailyProgress {
    /// Restore from a persisted record, field by field
    pub fn from_value(value: &Value) -> Self {
        let count = |name: &str| {
            value.get(name).and_then(Value::as_u64).map(|n| n.min(u32::MAX as u64) as u32)
        };
        let date = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
        };

        let attempts = count("attempts").unwrap_or(0);
        Self {
            version: DAILY_VERSION,
            date: date("date"),
            attempts,
            correct: count("correct").unwrap_or(0).min(attempts),
            streak: count("streak").unwrap_or(0),
            last_practice_date: date("lastPracticeDate"),
            reminder_date: date("reminderDate"),
        }
    }

    /// Start a new window if the stored day is not `today`; returns whether it rolled
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == Some(today) {
            return false;
        }
        self.date = Some(today);
        self.attempts = 0;
        self.correct = 0;
        true
    }

    /// Count one answer given on `today`
    pub fn record_attempt(&mut self, today: NaiveDate, is_correct: bool) {
        self.roll_over(today);

        match self.last_practice_date {
            Some(last) if last == today => {}
            Some(last) if today.signed_duration_since(last).num_days() == 1 => self.streak += 1,
            _ => self.streak = 1,
        }
        self.last_practice_date = Some(today);

        self.attempts += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    /// Fraction correct today, if anything was answered
    pub fn accuracy(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.correct as f64 / self.attempts as f64)
    }

    /// Whether the counters satisfy `goal`
    pub fn is_goal_met(&self, goal: &DailyGoal) -> bool {
        if self.attempts < goal.attempts {
            return false;
        }
        match self.accuracy() {
            Some(accuracy) => accuracy * 100.0 >= goal.accuracy,
            None => goal.attempts == 0,
        }
    }

    /// Day streak as seen on `today`; a missed day shows as zero until the next answer
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        match self.last_practice_date {
            Some(last) if today.signed_duration_since(last).num_days() <= 1 => self.streak,
            _ => 0,
        }
    }

    /// Whether the goal reminder should be shown now
    pub fn should_remind(&self, today: NaiveDate, goal: &DailyGoal) -> bool {
        let met_today = self.date == Some(today) && self.is_goal_met(goal);
        !met_today && self.reminder_date != Some(today)
    }

    /// Remember that the reminder was shown on `today`
    pub fn mark_reminded(&mut self, today: NaiveDate) {
        self.reminder_date = Some(today);
    }
}
