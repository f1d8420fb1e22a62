//! Per-day checklist state and the pure evaluation rules.
//!
//! Toggling and resetting are pure: they map an existing day state to a new
//! one. Persistence and event emission happen in the storage layer, in the
//! same transaction as the derived statistics delta.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::habit::Habit;

/// One checklist item's state for a specific day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayItem {
    pub id: Uuid,
    pub label: String,
    pub completed: bool,
}

/// The checklist state of one habit on one calendar day.
///
/// Created lazily the first time a day is touched, as an unchecked copy of
/// the habit's template. Each toggle overwrites the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayChecklist {
    pub habit_id: Uuid,
    pub day: NaiveDate,
    pub items: Vec<DayItem>,
}

impl DayChecklist {
    /// An unchecked copy of the habit's checklist template.
    pub fn from_template(habit: &Habit, day: NaiveDate) -> Self {
        Self {
            habit_id: habit.id,
            day,
            items: habit
                .checklist
                .iter()
                .map(|item| DayItem {
                    id: item.id,
                    label: item.label.clone(),
                    completed: false,
                })
                .collect(),
        }
    }

    /// Invert one item's completed flag, leaving the rest unchanged.
    pub fn toggle(&self, item_id: Uuid) -> Result<DayChecklist> {
        if !self.items.iter().any(|i| i.id == item_id) {
            return Err(CoreError::ItemNotFound {
                habit: self.habit_id,
                item: item_id,
            });
        }
        let items = self
            .items
            .iter()
            .map(|i| DayItem {
                id: i.id,
                label: i.label.clone(),
                completed: if i.id == item_id { !i.completed } else { i.completed },
            })
            .collect();
        Ok(DayChecklist {
            habit_id: self.habit_id,
            day: self.day,
            items,
        })
    }

    /// Clear every item's completed flag.
    pub fn reset(&self) -> DayChecklist {
        DayChecklist {
            habit_id: self.habit_id,
            day: self.day,
            items: self
                .items
                .iter()
                .map(|i| DayItem {
                    id: i.id,
                    label: i.label.clone(),
                    completed: false,
                })
                .collect(),
        }
    }

    pub fn completed_count(&self) -> u32 {
        self.items.iter().filter(|i| i.completed).count() as u32
    }

    /// Whether the day meets the habit's completion threshold.
    pub fn is_complete(&self, required_items: u32) -> bool {
        self.completed_count() >= required_items
    }
}
