use chrono::NaiveDate;
use clap::Subcommand;
use uuid::Uuid;

use habitflow_core::{ChecklistItem, Clock, Database, Habit, SystemClock};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit with a checklist template
    Add {
        /// Display name
        name: String,
        /// Checklist item label (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        /// Items required per day for completion (defaults to all)
        #[arg(long)]
        required: Option<u32>,
        /// First day the habit applies (defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// List all habits
    List,
    /// Rename a habit
    Rename {
        id: Uuid,
        name: String,
    },
    /// Change the per-day completion threshold
    SetRequired {
        id: Uuid,
        required: u32,
    },
    /// Replace the checklist template (already-materialized days keep
    /// their old snapshot)
    SetItems {
        id: Uuid,
        /// Checklist item label (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// Delete a habit (history survives with the reference cleared)
    Remove {
        id: Uuid,
    },
    /// Print a day's checklist state
    Day {
        id: Uuid,
        /// Day to inspect (defaults to today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Toggle one checklist item for a day
    Toggle {
        id: Uuid,
        /// 1-based position of the item in the checklist
        item: usize,
        /// Day to toggle on (defaults to today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Clear every checklist item for a day
    Reset {
        id: Uuid,
        /// Day to reset (defaults to today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
}

/// Resolve a 1-based checklist position to the item's id.
fn item_at(habit: &Habit, position: usize) -> Result<Uuid, Box<dyn std::error::Error>> {
    habit
        .checklist
        .get(position.wrapping_sub(1))
        .map(|item| item.id)
        .ok_or_else(|| {
            format!(
                "no checklist item at position {position} (habit has {})",
                habit.checklist.len()
            )
            .into()
        })
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let clock = SystemClock;

    match action {
        HabitAction::Add {
            name,
            items,
            required,
            start_date,
        } => {
            let checklist: Vec<ChecklistItem> =
                items.into_iter().map(ChecklistItem::new).collect();
            let required = required.unwrap_or(checklist.len() as u32);
            let habit = Habit::new(
                name,
                checklist,
                required,
                start_date.unwrap_or_else(|| clock.today()),
                clock.now(),
            );
            db.create_habit(&habit)?;
            println!("{}", serde_json::to_string_pretty(&habit)?);
        }
        HabitAction::List => {
            let habits = db.list_habits()?;
            println!("{}", serde_json::to_string_pretty(&habits)?);
        }
        HabitAction::Rename { id, name } => {
            let mut habit = db.require_habit(id)?;
            habit.name = name;
            db.update_habit(&habit)?;
            println!("{}", serde_json::to_string_pretty(&habit)?);
        }
        HabitAction::SetRequired { id, required } => {
            let mut habit = db.require_habit(id)?;
            habit.set_required_items(required);
            db.update_habit(&habit)?;
            println!("{}", serde_json::to_string_pretty(&habit)?);
        }
        HabitAction::SetItems { id, items } => {
            let mut habit = db.require_habit(id)?;
            habit.set_checklist(items.into_iter().map(ChecklistItem::new).collect());
            db.update_habit(&habit)?;
            println!("{}", serde_json::to_string_pretty(&habit)?);
        }
        HabitAction::Remove { id } => {
            db.delete_habit(id)?;
            println!("habit {id} removed");
        }
        HabitAction::Day { id, day } => {
            let habit = db.require_habit(id)?;
            let state = db.day_checklist(&habit, day.unwrap_or_else(|| clock.today()))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        HabitAction::Toggle { id, item, day } => {
            let habit = db.require_habit(id)?;
            let item_id = item_at(&habit, item)?;
            let outcome = db.toggle_checklist_item(
                id,
                item_id,
                day.unwrap_or_else(|| clock.today()),
                clock.now(),
            )?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        HabitAction::Reset { id, day } => {
            let outcome =
                db.reset_checklist(id, day.unwrap_or_else(|| clock.today()), clock.now())?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }
    Ok(())
}
