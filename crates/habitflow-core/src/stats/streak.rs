//! Consecutive-day completion runs, derived from the event log.
//!
//! Pure read-side computation: nothing here writes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::Database;

/// One habit's status on one day of a weekly window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Complete,
    Incomplete,
    /// No event exists for that day.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekDay {
    pub day: NaiveDate,
    pub status: DayStatus,
}

/// Derives streaks and weekly windows from the log and rollups.
pub struct StreakCalculator<'a> {
    db: &'a Database,
}

impl<'a> StreakCalculator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Consecutive fully-complete days ending at `reference_day`.
    ///
    /// Walks backward from the day before `reference_day`, counting days on
    /// which every applicable habit is complete. A day with zero applicable
    /// habits stops the walk (a data gap never inflates a streak). The
    /// reference day itself extends the run only when it is complete AND
    /// continues an existing run -- so an incomplete yesterday yields 0 even
    /// if today is already done, while a still-in-progress today does not
    /// break yesterday's run.
    pub fn current_streak(&self, reference_day: NaiveDate) -> Result<u64> {
        let mut streak = 0u64;
        let mut day = reference_day.pred_opt();
        while let Some(d) = day {
            let overview = self.db.query_day(d)?;
            if !overview.all_complete() {
                break;
            }
            streak += 1;
            day = d.pred_opt();
        }

        if streak > 0 && self.db.query_day(reference_day)?.all_complete() {
            streak += 1;
        }
        Ok(streak)
    }

    /// Per-day statuses for the trailing 7 days ending at `reference_day`
    /// inclusive, from the latest habit-kind event of each day.
    pub fn weekly_window(&self, reference_day: NaiveDate, habit_id: Uuid) -> Result<Vec<WeekDay>> {
        self.db.require_habit(habit_id)?;
        let mut window = Vec::with_capacity(7);
        for offset in (0..7).rev() {
            let day = reference_day - chrono::Duration::days(offset);
            let status = match self.db.latest_habit_event(habit_id, day)? {
                Some(event) if event.is_completed() => DayStatus::Complete,
                Some(_) => DayStatus::Incomplete,
                None => DayStatus::None,
            };
            window.push(WeekDay { day, status });
        }
        Ok(window)
    }
}
