//! The append-only calendar event log.
//!
//! Every completion toggle and every completed focus session produces a
//! [`CalendarEvent`]; history is never rewritten. The "current" value for a
//! `(habit, day, kind)` key is the latest event by creation time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Habit,
    Pomodoro,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Habit => "habit",
            EventKind::Pomodoro => "pomodoro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "habit" => Some(EventKind::Habit),
            "pomodoro" => Some(EventKind::Pomodoro),
            _ => None,
        }
    }
}

/// An immutable record of a completion or session-duration occurrence.
///
/// `completed` is set for habit-kind events, `duration_secs` for
/// pomodoro-kind events. `habit_id` survives habit deletion as `None` so
/// historical statistics stay reconstructible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Database rowid; orders events created at the same instant.
    pub id: i64,
    pub habit_id: Option<Uuid>,
    pub day: NaiveDate,
    pub kind: EventKind,
    pub completed: Option<bool>,
    pub duration_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// The completed flag of a habit-kind event; `false` for anything else.
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}
