//! SQLite-based storage for habits, sessions, the calendar event log, and
//! the per-day statistics rollups.
//!
//! Concurrency guarantees live at this layer:
//! - a partial unique index on `sessions(status) WHERE status = 'active'`
//!   makes the single-active-session check race-free across connections;
//! - statistics increments are single-statement `ON CONFLICT DO UPDATE`
//!   upserts, atomic per (habit_id, day) key;
//! - composite writes (toggle + event + stats, completion + event + stats)
//!   run inside `BEGIN IMMEDIATE` transactions and commit or roll back as
//!   a unit.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::calendar::{CalendarEvent, EventKind};
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::{ChecklistItem, DayChecklist, Habit};
use crate::session::{FocusSession, SessionStatus};
use crate::stats::{
    DayOverview, HabitDayStatus, HabitStatistics, RangeDay, StatsDelta, Summary,
};

// === Helper Functions ===

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn decode_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_day(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| decode_err(idx, e))
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(idx, e))
}

fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| decode_err(idx, e))
}

/// Build a Habit from a `SELECT id, name, checklist, required_items,
/// start_date, created_at` row.
fn row_to_habit(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    let id: String = row.get(0)?;
    let checklist_json: String = row.get(2)?;
    let checklist: Vec<ChecklistItem> =
        serde_json::from_str(&checklist_json).map_err(|e| decode_err(2, e))?;
    let start_date: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Habit {
        id: parse_uuid(0, &id)?,
        name: row.get(1)?,
        checklist,
        required_items: row.get(3)?,
        start_date: parse_day(4, &start_date)?,
        created_at: parse_datetime(5, &created_at)?,
    })
}

/// Build a FocusSession from a `SELECT id, habit_id, status, target_secs,
/// duration_secs, started_at, ended_at` row.
fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<FocusSession> {
    let id: String = row.get(0)?;
    let habit_id: Option<String> = row.get(1)?;
    let status: String = row.get(2)?;
    let started_at: String = row.get(5)?;
    let ended_at: Option<String> = row.get(6)?;
    Ok(FocusSession {
        id: parse_uuid(0, &id)?,
        habit_id: habit_id.as_deref().map(|s| parse_uuid(1, s)).transpose()?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| decode_err(2, InvalidEnumValue(status.clone())))?,
        target_secs: row.get(3)?,
        duration_secs: row.get(4)?,
        started_at: parse_datetime(5, &started_at)?,
        ended_at: ended_at.as_deref().map(|s| parse_datetime(6, s)).transpose()?,
    })
}

/// Build a CalendarEvent from a `SELECT id, habit_id, day, kind, completed,
/// duration_secs, created_at` row.
fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<CalendarEvent> {
    let habit_id: Option<String> = row.get(1)?;
    let day: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let completed: Option<i64> = row.get(4)?;
    let created_at: String = row.get(6)?;
    Ok(CalendarEvent {
        id: row.get(0)?,
        habit_id: habit_id.as_deref().map(|s| parse_uuid(1, s)).transpose()?,
        day: parse_day(2, &day)?,
        kind: EventKind::parse(&kind)
            .ok_or_else(|| decode_err(3, InvalidEnumValue(kind.clone())))?,
        completed: completed.map(|v| v != 0),
        duration_secs: row.get(5)?,
        created_at: parse_datetime(6, &created_at)?,
    })
}

/// Build a HabitStatistics from a `SELECT habit_id, day, total_pomodoros,
/// total_duration_secs, completed_habits, failed_habits` row.
fn row_to_stats(row: &rusqlite::Row) -> rusqlite::Result<HabitStatistics> {
    let habit_id: String = row.get(0)?;
    let day: String = row.get(1)?;
    Ok(HabitStatistics {
        habit_id: parse_uuid(0, &habit_id)?,
        day: parse_day(1, &day)?,
        total_pomodoros: row.get(2)?,
        total_duration_secs: row.get(3)?,
        completed_habits: row.get(4)?,
        failed_habits: row.get(5)?,
    })
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized stored value: {0}")]
struct InvalidEnumValue(String);

/// The result of a checklist toggle or reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistOutcome {
    pub state: DayChecklist,
    pub completed_count: u32,
    pub is_complete: bool,
    /// The habit-kind event appended for this action.
    pub event: CalendarEvent,
}

/// SQLite database for habitflow.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/habitflow/habitflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("habitflow.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (primarily for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Concurrent connections retry briefly instead of failing with
        // SQLITE_BUSY while another writer holds the lock.
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> rusqlite::Result<()> {
        // Base (v1) schema; later columns are added by incremental migrations.
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS habits (
                id             TEXT PRIMARY KEY,
                name           TEXT NOT NULL,
                checklist      TEXT NOT NULL DEFAULT '[]',
                required_items INTEGER NOT NULL DEFAULT 1,
                created_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS day_checklists (
                habit_id   TEXT NOT NULL,
                day        TEXT NOT NULL,
                items      TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL,
                PRIMARY KEY (habit_id, day)
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                habit_id      TEXT,
                status        TEXT NOT NULL,
                target_secs   INTEGER NOT NULL,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                started_at    TEXT NOT NULL,
                ended_at      TEXT
            );

            CREATE TABLE IF NOT EXISTS events (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                habit_id      TEXT,
                day           TEXT NOT NULL,
                kind          TEXT NOT NULL,
                completed     INTEGER,
                duration_secs INTEGER,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_stats (
                habit_id            TEXT NOT NULL,
                day                 TEXT NOT NULL,
                total_pomodoros     INTEGER NOT NULL DEFAULT 0,
                total_duration_secs INTEGER NOT NULL DEFAULT 0,
                completed_habits    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (habit_id, day)
            );

            CREATE INDEX IF NOT EXISTS idx_events_day ON events(day);
            CREATE INDEX IF NOT EXISTS idx_events_habit_day_kind ON events(habit_id, day, kind);",
        )?;

        // Run incremental migrations (v1 -> v2 -> v3).
        migrations::migrate(&self.conn)?;

        // At most one active session, enforced even across connections
        // (idempotent, runs after migrations).
        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_single_active
             ON sessions(status)
             WHERE status = 'active'",
            [],
        )?;

        Ok(())
    }

    /// Run `body` inside a `BEGIN IMMEDIATE` transaction, committing on
    /// success and rolling back on error.
    fn in_transaction<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match body() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    // === Habit CRUD ===

    /// Create a new habit.
    pub fn create_habit(&self, habit: &Habit) -> Result<()> {
        self.conn.execute(
            "INSERT INTO habits (id, name, checklist, required_items, start_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.id.to_string(),
                habit.name,
                serde_json::to_string(&habit.checklist)?,
                habit.required_items,
                format_day(habit.start_date),
                habit.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a habit by id.
    pub fn get_habit(&self, id: Uuid) -> Result<Option<Habit>> {
        let habit = self
            .conn
            .query_row(
                "SELECT id, name, checklist, required_items, start_date, created_at
                 FROM habits WHERE id = ?1",
                params![id.to_string()],
                row_to_habit,
            )
            .optional()?;
        Ok(habit)
    }

    /// Get a habit by id, failing if it does not exist.
    pub fn require_habit(&self, id: Uuid) -> Result<Habit> {
        self.get_habit(id)?.ok_or(CoreError::HabitNotFound { id })
    }

    /// All habits, oldest first.
    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, checklist, required_items, start_date, created_at
             FROM habits ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], row_to_habit)?;
        let mut habits = Vec::new();
        for row in rows {
            habits.push(row?);
        }
        Ok(habits)
    }

    /// Persist template edits (name, checklist, requirement, start date).
    ///
    /// Per-day state is untouched: days already materialized keep the
    /// checklist snapshot they were created with.
    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habits SET name = ?2, checklist = ?3, required_items = ?4, start_date = ?5
             WHERE id = ?1",
            params![
                habit.id.to_string(),
                habit.name,
                serde_json::to_string(&habit.checklist)?,
                habit.required_items,
                format_day(habit.start_date),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::HabitNotFound { id: habit.id });
        }
        Ok(())
    }

    /// Delete a habit.
    ///
    /// Historical sessions and events survive with their habit reference
    /// nullified; the habit's per-day checklist state and statistics rows
    /// are removed.
    pub fn delete_habit(&self, id: Uuid) -> Result<()> {
        self.in_transaction(|| {
            let key = id.to_string();
            let deleted = self
                .conn
                .execute("DELETE FROM habits WHERE id = ?1", params![key])?;
            if deleted == 0 {
                return Err(CoreError::HabitNotFound { id });
            }
            self.conn.execute(
                "UPDATE sessions SET habit_id = NULL WHERE habit_id = ?1",
                params![key],
            )?;
            self.conn.execute(
                "UPDATE events SET habit_id = NULL WHERE habit_id = ?1",
                params![key],
            )?;
            self.conn.execute(
                "DELETE FROM day_checklists WHERE habit_id = ?1",
                params![key],
            )?;
            self.conn.execute(
                "DELETE FROM daily_stats WHERE habit_id = ?1",
                params![key],
            )?;
            Ok(())
        })
    }

    // === Day checklists ===

    /// The checklist state of a habit on a day.
    ///
    /// Falls back to an unchecked copy of the template when the day has
    /// never been touched; nothing is persisted until the first toggle.
    pub fn day_checklist(&self, habit: &Habit, day: NaiveDate) -> Result<DayChecklist> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT items FROM day_checklists WHERE habit_id = ?1 AND day = ?2",
                params![habit.id.to_string(), format_day(day)],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(json) => {
                let items = serde_json::from_str(&json)?;
                Ok(DayChecklist {
                    habit_id: habit.id,
                    day,
                    items,
                })
            }
            None => Ok(habit.blank_day(day)),
        }
    }

    fn put_day_checklist(
        &self,
        state: &DayChecklist,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO day_checklists (habit_id, day, items, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(habit_id, day) DO UPDATE SET
                 items = excluded.items,
                 updated_at = excluded.updated_at",
            params![
                state.habit_id.to_string(),
                format_day(state.day),
                serde_json::to_string(&state.items)?,
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Toggle one checklist item for (habit, day).
    ///
    /// Persists the new snapshot, appends a habit-kind event with the
    /// derived completion, and applies the flip-tracked statistics delta,
    /// all in one transaction.
    pub fn toggle_checklist_item(
        &self,
        habit_id: Uuid,
        item_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ChecklistOutcome> {
        self.in_transaction(|| {
            let habit = self.require_habit(habit_id)?;
            let state = self.day_checklist(&habit, day)?;
            let state = state.toggle(item_id)?;
            self.apply_checklist_state(&habit, state, day, now)
        })
    }

    /// Clear every item of (habit, day), with the same side effects as a
    /// toggle.
    pub fn reset_checklist(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ChecklistOutcome> {
        self.in_transaction(|| {
            let habit = self.require_habit(habit_id)?;
            let state = self.day_checklist(&habit, day)?;
            let state = state.reset();
            self.apply_checklist_state(&habit, state, day, now)
        })
    }

    /// Shared tail of toggle/reset: persist the snapshot, append the event,
    /// and count a flip if the derived completion changed. Runs inside the
    /// caller's transaction.
    fn apply_checklist_state(
        &self,
        habit: &Habit,
        state: DayChecklist,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ChecklistOutcome> {
        let is_complete = state.is_complete(habit.required_items);
        let previously_complete = self
            .latest_habit_event(habit.id, day)?
            .map(|e| e.is_completed())
            .unwrap_or(false);

        self.put_day_checklist(&state, now)?;
        let event = self.insert_event(
            Some(habit.id),
            day,
            EventKind::Habit,
            Some(is_complete),
            None,
            now,
        )?;

        if is_complete != previously_complete {
            let delta = if is_complete {
                StatsDelta::CompletedHabit
            } else {
                StatsDelta::FailedHabit
            };
            self.upsert_daily_stats(habit.id, day, delta)?;
        }

        Ok(ChecklistOutcome {
            completed_count: state.completed_count(),
            is_complete,
            state,
            event,
        })
    }

    // === Sessions ===

    /// Insert a new session row.
    ///
    /// The partial unique index rejects a second active session; the
    /// constraint violation maps to `SessionAlreadyActive` (session ids are
    /// v4 UUIDs, so the only practical unique conflict is the active-status
    /// index).
    pub fn insert_session(&self, session: &FocusSession) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO sessions (id, habit_id, status, target_secs, duration_secs, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.to_string(),
                session.habit_id.map(|id| id.to_string()),
                session.status.as_str(),
                session.target_secs,
                session.duration_secs,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CoreError::SessionAlreadyActive)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a session by id.
    pub fn get_session(&self, id: Uuid) -> Result<Option<FocusSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, habit_id, status, target_secs, duration_secs, started_at, ended_at
                 FROM sessions WHERE id = ?1",
                params![id.to_string()],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// The currently active session, if any.
    pub fn active_session(&self) -> Result<Option<FocusSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, habit_id, status, target_secs, duration_secs, started_at, ended_at
                 FROM sessions WHERE status = 'active'",
                [],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Overwrite the progress counter of an active session.
    ///
    /// Conditional on `status = 'active'` so a late update can never touch
    /// a terminal session.
    pub fn update_session_duration(&self, id: Uuid, duration_secs: u64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions SET duration_secs = ?2 WHERE id = ?1 AND status = 'active'",
            params![id.to_string(), duration_secs],
        )?;
        if changed == 0 {
            return Err(self.session_update_failure(id)?);
        }
        Ok(())
    }

    /// Complete an active session at `now`.
    ///
    /// The stored duration becomes the authoritative `now - started_at`.
    /// When the session references a habit, one pomodoro event and one
    /// stats increment land in the same transaction as the status change.
    pub fn complete_session(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(FocusSession, Option<CalendarEvent>)> {
        self.in_transaction(|| {
            let session = self
                .get_session(id)?
                .ok_or(CoreError::SessionNotFound { id })?;
            let duration_secs = (now - session.started_at).num_seconds().max(0) as u64;

            let changed = self.conn.execute(
                "UPDATE sessions SET status = 'completed', ended_at = ?2, duration_secs = ?3
                 WHERE id = ?1 AND status = 'active'",
                params![id.to_string(), now.to_rfc3339(), duration_secs],
            )?;
            if changed == 0 {
                return Err(CoreError::SessionNotActive { id });
            }

            let day = now.date_naive();
            let event = match session.habit_id {
                Some(habit_id) => {
                    let event = self.insert_event(
                        Some(habit_id),
                        day,
                        EventKind::Pomodoro,
                        None,
                        Some(duration_secs),
                        now,
                    )?;
                    self.upsert_daily_stats(habit_id, day, StatsDelta::Pomodoro { duration_secs })?;
                    Some(event)
                }
                None => None,
            };

            let completed = FocusSession {
                status: SessionStatus::Completed,
                duration_secs,
                ended_at: Some(now),
                ..session
            };
            Ok((completed, event))
        })
    }

    /// Cancel an active session at `now`. No statistics side effects.
    pub fn cancel_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<FocusSession> {
        self.in_transaction(|| {
            let session = self
                .get_session(id)?
                .ok_or(CoreError::SessionNotFound { id })?;
            let changed = self.conn.execute(
                "UPDATE sessions SET status = 'cancelled', ended_at = ?2
                 WHERE id = ?1 AND status = 'active'",
                params![id.to_string(), now.to_rfc3339()],
            )?;
            if changed == 0 {
                return Err(CoreError::SessionNotActive { id });
            }
            Ok(FocusSession {
                status: SessionStatus::Cancelled,
                ended_at: Some(now),
                ..session
            })
        })
    }

    /// Recent sessions, newest first.
    pub fn list_sessions(&self, limit: u32) -> Result<Vec<FocusSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, status, target_secs, duration_secs, started_at, ended_at
             FROM sessions ORDER BY started_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Distinguish "no such session" from "session is terminal" after a
    /// conditional update touched zero rows.
    fn session_update_failure(&self, id: Uuid) -> Result<CoreError> {
        Ok(match self.get_session(id)? {
            Some(_) => CoreError::SessionNotActive { id },
            None => CoreError::SessionNotFound { id },
        })
    }

    // === Calendar events ===

    fn insert_event(
        &self,
        habit_id: Option<Uuid>,
        day: NaiveDate,
        kind: EventKind,
        completed: Option<bool>,
        duration_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent> {
        self.conn.execute(
            "INSERT INTO events (habit_id, day, kind, completed, duration_secs, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit_id.map(|id| id.to_string()),
                format_day(day),
                kind.as_str(),
                completed.map(|c| c as i64),
                duration_secs,
                now.to_rfc3339(),
            ],
        )?;
        Ok(CalendarEvent {
            id: self.conn.last_insert_rowid(),
            habit_id,
            day,
            kind,
            completed,
            duration_secs,
            created_at: now,
        })
    }

    /// Append a habit-kind completion event.
    pub fn append_habit_event(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent> {
        self.require_habit(habit_id)?;
        self.insert_event(Some(habit_id), day, EventKind::Habit, Some(completed), None, now)
    }

    /// Append a pomodoro-kind duration event.
    pub fn append_pomodoro_event(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent> {
        self.require_habit(habit_id)?;
        self.insert_event(
            Some(habit_id),
            day,
            EventKind::Pomodoro,
            None,
            Some(duration_secs),
            now,
        )
    }

    /// The latest habit-kind event for (habit, day), by creation time.
    pub fn latest_habit_event(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<CalendarEvent>> {
        let event = self
            .conn
            .query_row(
                "SELECT id, habit_id, day, kind, completed, duration_secs, created_at
                 FROM events
                 WHERE habit_id = ?1 AND day = ?2 AND kind = 'habit'
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                params![habit_id.to_string(), format_day(day)],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    // === Statistics rollups ===

    /// Apply one increment to the (habit_id, day) rollup row.
    ///
    /// A single `ON CONFLICT DO UPDATE` statement: creates the row with
    /// zeros-plus-delta if absent, otherwise adds the delta fields. Atomic
    /// per key under concurrent callers.
    pub fn upsert_daily_stats(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
        delta: StatsDelta,
    ) -> Result<()> {
        let (pomodoros, duration_secs, completed, failed) = match delta {
            StatsDelta::CompletedHabit => (0u64, 0u64, 1u64, 0u64),
            StatsDelta::FailedHabit => (0, 0, 0, 1),
            StatsDelta::Pomodoro { duration_secs } => (1, duration_secs, 0, 0),
        };
        self.conn.execute(
            "INSERT INTO daily_stats
                 (habit_id, day, total_pomodoros, total_duration_secs, completed_habits, failed_habits)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(habit_id, day) DO UPDATE SET
                 total_pomodoros     = total_pomodoros + excluded.total_pomodoros,
                 total_duration_secs = total_duration_secs + excluded.total_duration_secs,
                 completed_habits    = completed_habits + excluded.completed_habits,
                 failed_habits       = failed_habits + excluded.failed_habits",
            params![
                habit_id.to_string(),
                format_day(day),
                pomodoros,
                duration_secs,
                completed,
                failed
            ],
        )?;
        Ok(())
    }

    /// The rollup row for (habit_id, day), if any event has touched it.
    pub fn stats_for(&self, habit_id: Uuid, day: NaiveDate) -> Result<Option<HabitStatistics>> {
        let stats = self
            .conn
            .query_row(
                "SELECT habit_id, day, total_pomodoros, total_duration_secs, completed_habits, failed_habits
                 FROM daily_stats WHERE habit_id = ?1 AND day = ?2",
                params![habit_id.to_string(), format_day(day)],
                row_to_stats,
            )
            .optional()?;
        Ok(stats)
    }

    // === Queries ===

    /// Per-habit completion states for one day.
    ///
    /// Covers every habit applicable on `day` (start date on or before it);
    /// a habit with no event that day reports `completed = false`.
    pub fn query_day(&self, day: NaiveDate) -> Result<DayOverview> {
        let mut habits = Vec::new();
        for habit in self.list_habits()? {
            if !habit.applies_on(day) {
                continue;
            }
            let completed = self
                .latest_habit_event(habit.id, day)?
                .map(|e| e.is_completed())
                .unwrap_or(false);
            habits.push(HabitDayStatus {
                habit_id: habit.id,
                name: habit.name,
                completed,
            });
        }
        Ok(DayOverview { day, habits })
    }

    /// All events and rollup rows with `start_day <= day <= end_day`,
    /// grouped by day. Read-only.
    pub fn query_range(
        &self,
        start_day: NaiveDate,
        end_day: NaiveDate,
        habit_id: Option<Uuid>,
    ) -> Result<Vec<RangeDay>> {
        use std::collections::BTreeMap;

        let habit_key = habit_id.map(|id| id.to_string());
        let mut days: BTreeMap<NaiveDate, RangeDay> = BTreeMap::new();

        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, day, kind, completed, duration_secs, created_at
             FROM events
             WHERE day >= ?1 AND day <= ?2 AND (?3 IS NULL OR habit_id = ?3)
             ORDER BY day ASC, created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![format_day(start_day), format_day(end_day), habit_key],
            row_to_event,
        )?;
        for row in rows {
            let event = row?;
            days.entry(event.day)
                .or_insert_with(|| RangeDay {
                    day: event.day,
                    events: Vec::new(),
                    stats: Vec::new(),
                })
                .events
                .push(event);
        }

        let mut stmt = self.conn.prepare(
            "SELECT habit_id, day, total_pomodoros, total_duration_secs, completed_habits, failed_habits
             FROM daily_stats
             WHERE day >= ?1 AND day <= ?2 AND (?3 IS NULL OR habit_id = ?3)
             ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(
            params![format_day(start_day), format_day(end_day), habit_key],
            row_to_stats,
        )?;
        for row in rows {
            let stats = row?;
            days.entry(stats.day)
                .or_insert_with(|| RangeDay {
                    day: stats.day,
                    events: Vec::new(),
                    stats: Vec::new(),
                })
                .stats
                .push(stats);
        }

        Ok(days.into_values().collect())
    }

    /// Cross-habit totals, derived from the rollup table only.
    pub fn summary(&self, today: NaiveDate) -> Result<Summary> {
        let (total_pomodoros, total_focus_secs, completed_habits, failed_habits) =
            self.conn.query_row(
                "SELECT COALESCE(SUM(total_pomodoros), 0),
                        COALESCE(SUM(total_duration_secs), 0),
                        COALESCE(SUM(completed_habits), 0),
                        COALESCE(SUM(failed_habits), 0)
                 FROM daily_stats",
                [],
                |row| {
                    Ok((
                        row.get::<_, u64>(0)?,
                        row.get::<_, u64>(1)?,
                        row.get::<_, u64>(2)?,
                        row.get::<_, u64>(3)?,
                    ))
                },
            )?;

        let (today_pomodoros, today_focus_secs) = self.conn.query_row(
            "SELECT COALESCE(SUM(total_pomodoros), 0), COALESCE(SUM(total_duration_secs), 0)
             FROM daily_stats WHERE day = ?1",
            params![format_day(today)],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;

        Ok(Summary {
            total_pomodoros,
            total_focus_secs,
            completed_habits,
            failed_habits,
            today_pomodoros,
            today_focus_secs,
        })
    }
}
