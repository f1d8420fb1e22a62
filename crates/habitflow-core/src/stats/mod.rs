//! Statistics rollups derived from the calendar event log.
//!
//! [`HabitStatistics`] rows are additive per-(habit, day) accumulators:
//! created on the first event for a key, then updated only through
//! increment upserts so repeated or concurrent event application stays
//! order-independent. They are derived data and never hand-edited.

mod streak;

pub use streak::{DayStatus, StreakCalculator, WeekDay};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::CalendarEvent;

/// Per-(habit, day) accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStatistics {
    pub habit_id: Uuid,
    pub day: NaiveDate,
    pub total_pomodoros: u64,
    pub total_duration_secs: u64,
    pub completed_habits: u64,
    pub failed_habits: u64,
}

/// An increment applied to one statistics row.
///
/// Deltas are the only way rollups change; each is applied as a single
/// atomic upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StatsDelta {
    /// A day flipped incomplete -> complete.
    CompletedHabit,
    /// A day flipped complete -> incomplete.
    FailedHabit,
    /// One focus session finished with the given duration.
    Pomodoro { duration_secs: u64 },
}

/// One habit's completion state on a given day, as seen by `query_day`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitDayStatus {
    pub habit_id: Uuid,
    pub name: String,
    /// Latest habit-kind event's flag; `false` when the day has no event.
    pub completed: bool,
}

/// Everything known about a single day: per-habit completion states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOverview {
    pub day: NaiveDate,
    /// Habits applicable on `day` (start date on or before it).
    pub habits: Vec<HabitDayStatus>,
}

impl DayOverview {
    /// True when at least one habit applies and all of them are complete.
    pub fn all_complete(&self) -> bool {
        !self.habits.is_empty() && self.habits.iter().all(|h| h.completed)
    }
}

/// One day of a range query: raw events plus rollup rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeDay {
    pub day: NaiveDate,
    pub events: Vec<CalendarEvent>,
    pub stats: Vec<HabitStatistics>,
}

/// Cross-habit totals derived from the rollup table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_pomodoros: u64,
    pub total_focus_secs: u64,
    pub completed_habits: u64,
    pub failed_habits: u64,
    pub today_pomodoros: u64,
    pub today_focus_secs: u64,
}
