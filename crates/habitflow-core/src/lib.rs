//! # Habitflow Core Library
//!
//! This library provides the core business logic for Habitflow, a tracker
//! for recurring habits and focus (pomodoro) sessions. It implements a
//! CLI-first philosophy where all operations are available via a standalone
//! CLI binary; any GUI layer is a thin client over the same core library.
//!
//! ## Architecture
//!
//! - **Session lifecycle**: a wall-clock-based state machine; the caller
//!   (or a spawned ticker) periodically records progress and triggers
//!   completion at the deadline
//! - **Checklist evaluation**: pure per-day checklist state derived from a
//!   habit's template, with a completion threshold
//! - **Event log + rollups**: an append-only calendar event log and
//!   increment-only per-(habit, day) statistics kept consistent with it
//! - **Storage**: SQLite-based persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionManager`]: session start/progress/complete/cancel
//! - [`SessionTicker`]: cancellable auto-completion task
//! - [`Database`]: habits, sessions, events, and statistics persistence
//! - [`StreakCalculator`]: consecutive-day completion runs
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod clock;
pub mod error;
pub mod habit;
pub mod session;
pub mod stats;
pub mod storage;

pub use calendar::{CalendarEvent, EventKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use habit::{ChecklistItem, DayChecklist, DayItem, Habit};
pub use session::{
    FocusSession, Progress, SessionManager, SessionStatus, SessionTicker, TickerOutcome,
    MAX_TARGET_MINUTES, MIN_TARGET_MINUTES,
};
pub use stats::{
    DayOverview, DayStatus, HabitDayStatus, HabitStatistics, RangeDay, StatsDelta,
    StreakCalculator, Summary, WeekDay,
};
pub use storage::{ChecklistOutcome, Config, Database};
