use chrono::NaiveDate;
use clap::Subcommand;
use uuid::Uuid;

use habitflow_core::{Clock, Database, StreakCalculator, SystemClock};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Per-habit completion states for one day
    Day {
        /// Day to inspect (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Events and rollups for an inclusive day range
    Range {
        start: NaiveDate,
        end: NaiveDate,
        /// Restrict to one habit
        #[arg(long)]
        habit: Option<Uuid>,
    },
    /// Consecutive-day completion streak
    Streak {
        /// Reference day (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Trailing 7-day window for one habit
    Week {
        habit: Uuid,
        /// Reference day (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Cross-habit totals (all-time and today)
    Summary,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let clock = SystemClock;

    match action {
        StatsAction::Day { date } => {
            let overview = db.query_day(date.unwrap_or_else(|| clock.today()))?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        StatsAction::Range { start, end, habit } => {
            let range = db.query_range(start, end, habit)?;
            println!("{}", serde_json::to_string_pretty(&range)?);
        }
        StatsAction::Streak { date } => {
            let calc = StreakCalculator::new(&db);
            let streak = calc.current_streak(date.unwrap_or_else(|| clock.today()))?;
            println!("{streak}");
        }
        StatsAction::Week { habit, date } => {
            let calc = StreakCalculator::new(&db);
            let window = calc.weekly_window(date.unwrap_or_else(|| clock.today()), habit)?;
            println!("{}", serde_json::to_string_pretty(&window)?);
        }
        StatsAction::Summary => {
            let summary = db.summary(clock.today())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
