//! Habit templates and per-day checklist state.
//!
//! A [`Habit`] owns an ordered checklist *template*. The per-day completion
//! state lives in a separate [`DayChecklist`] snapshot so that day-to-day
//! toggles never mutate the template (and template edits never rewrite
//! history).

mod checklist;

pub use checklist::{DayChecklist, DayItem};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sub-task of a habit, completed independently per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub label: String,
}

impl ChecklistItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
        }
    }
}

/// A recurring user-defined task template.
///
/// `required_items` is the per-day completion threshold: the day counts as
/// complete once at least that many checklist items are checked. It is kept
/// within `1..=checklist.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub name: String,
    pub checklist: Vec<ChecklistItem>,
    pub required_items: u32,
    /// The habit does not apply to days before this date.
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(
        name: impl Into<String>,
        checklist: Vec<ChecklistItem>,
        required_items: u32,
        start_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        let required_items = clamp_required(required_items, checklist.len());
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            checklist,
            required_items,
            start_date,
            created_at,
        }
    }

    /// True if the habit applies on the given day.
    pub fn applies_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day
    }

    /// Replace the checklist template, re-clamping the threshold.
    pub fn set_checklist(&mut self, checklist: Vec<ChecklistItem>) {
        self.checklist = checklist;
        self.required_items = clamp_required(self.required_items, self.checklist.len());
    }

    pub fn set_required_items(&mut self, required_items: u32) {
        self.required_items = clamp_required(required_items, self.checklist.len());
    }

    /// An unchecked per-day copy of the template.
    pub fn blank_day(&self, day: NaiveDate) -> DayChecklist {
        DayChecklist::from_template(self, day)
    }
}

fn clamp_required(required: u32, len: usize) -> u32 {
    let max = len.max(1) as u32;
    required.clamp(1, max)
}
