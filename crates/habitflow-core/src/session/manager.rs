//! Session lifecycle manager.
//!
//! The single authoritative source of the currently running focus session.
//! Wall-clock based: the manager never runs a background timer itself --
//! progress updates and the completion call arrive from the caller (or from
//! a [`super::SessionTicker`]).

use log::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::session::{
    FocusSession, SessionStatus, MAX_TARGET_MINUTES, MIN_TARGET_MINUTES,
};
use crate::storage::Database;

/// Default interval between persisted progress updates, in seconds.
///
/// `record_progress` is designed to be called every few seconds; writes are
/// coalesced so the database sees at most one update per interval.
pub const DEFAULT_FLUSH_SECS: u64 = 15;

/// The outcome of a progress update.
#[derive(Debug, Clone)]
pub struct Progress {
    pub session: FocusSession,
    /// The counter has reached the target; the caller should complete.
    pub reached_target: bool,
    /// Whether this update was written through to storage.
    pub persisted: bool,
}

pub struct SessionManager<'a, C: Clock> {
    db: &'a Database,
    clock: C,
    flush_secs: u64,
}

impl<'a, C: Clock> SessionManager<'a, C> {
    pub fn new(db: &'a Database, clock: C) -> Self {
        Self {
            db,
            clock,
            flush_secs: DEFAULT_FLUSH_SECS,
        }
    }

    pub fn with_flush_interval(db: &'a Database, clock: C, flush_secs: u64) -> Self {
        Self {
            db,
            clock,
            flush_secs,
        }
    }

    /// Start a new focus session.
    ///
    /// # Errors
    /// `InvalidDuration` outside 5..=240 minutes; `SessionAlreadyActive`
    /// if another session is running (checked again by the storage layer's
    /// unique index, so concurrent starts cannot both succeed);
    /// `HabitNotFound` for a dangling habit reference.
    pub fn start(&self, habit_id: Option<Uuid>, target_minutes: u32) -> Result<FocusSession> {
        if !(MIN_TARGET_MINUTES..=MAX_TARGET_MINUTES).contains(&target_minutes) {
            return Err(CoreError::InvalidDuration {
                minutes: target_minutes,
            });
        }
        if let Some(id) = habit_id {
            self.db.require_habit(id)?;
        }
        if self.db.active_session()?.is_some() {
            return Err(CoreError::SessionAlreadyActive);
        }

        let session = FocusSession {
            id: Uuid::new_v4(),
            habit_id,
            status: SessionStatus::Active,
            target_secs: u64::from(target_minutes) * 60,
            duration_secs: 0,
            started_at: self.clock.now(),
            ended_at: None,
        };
        self.db.insert_session(&session)?;
        debug!("session {} started, target {}s", session.id, session.target_secs);
        Ok(session)
    }

    /// Overwrite the session's progress counter.
    ///
    /// A liveness update only: no event emission, no statistics. Writes are
    /// coalesced -- the counter is persisted when it has advanced by at
    /// least the flush interval or crosses the target. Late updates against
    /// a terminal session fail with `SessionNotActive`.
    pub fn record_progress(&self, session_id: Uuid, elapsed_secs: u64) -> Result<Progress> {
        let session = self
            .db
            .get_session(session_id)?
            .ok_or(CoreError::SessionNotFound { id: session_id })?;
        if !session.is_active() {
            return Err(CoreError::SessionNotActive { id: session_id });
        }

        let reached_target = elapsed_secs >= session.target_secs;
        let advanced = elapsed_secs.saturating_sub(session.duration_secs);
        let persisted = reached_target || advanced >= self.flush_secs;
        if persisted {
            self.db.update_session_duration(session_id, elapsed_secs)?;
        }

        Ok(Progress {
            session: FocusSession {
                duration_secs: if persisted {
                    elapsed_secs
                } else {
                    session.duration_secs
                },
                ..session
            },
            reached_target,
            persisted,
        })
    }

    /// Complete the session.
    ///
    /// The stored duration is the authoritative `now - started_at`, not the
    /// client-reported counter, to tolerate missed updates. This is the only
    /// session path with statistics side effects: one pomodoro event and one
    /// rollup increment when a habit is referenced.
    pub fn complete(&self, session_id: Uuid) -> Result<FocusSession> {
        let (session, event) = self.db.complete_session(session_id, self.clock.now())?;
        if let Some(event) = &event {
            debug!(
                "session {} completed: {}s recorded for habit {:?} on {}",
                session.id, session.duration_secs, event.habit_id, event.day
            );
        }
        Ok(session)
    }

    /// Cancel the session. Terminal; no statistics side effects.
    pub fn cancel(&self, session_id: Uuid) -> Result<FocusSession> {
        let session = self.db.cancel_session(session_id, self.clock.now())?;
        debug!("session {} cancelled", session.id);
        Ok(session)
    }

    /// The currently active session, if any.
    pub fn active(&self) -> Result<Option<FocusSession>> {
        self.db.active_session()
    }

    /// Wall-clock seconds elapsed since the session started.
    pub fn elapsed_secs(&self, session: &FocusSession) -> u64 {
        (self.clock.now() - session.started_at).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::clock::FixedClock;
    use crate::habit::{ChecklistItem, Habit};

    fn setup() -> (Database, FixedClock) {
        let db = Database::open_memory().unwrap();
        let clock = FixedClock::at_day(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        (db, clock)
    }

    #[test]
    fn start_validates_target_bounds() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);

        for minutes in [5, 25, 240] {
            let session = manager.start(None, minutes).unwrap();
            assert_eq!(session.target_secs, u64::from(minutes) * 60);
            manager.cancel(session.id).unwrap();
        }
        for minutes in [0, 3, 4, 241, 1000] {
            let err = manager.start(None, minutes).unwrap_err();
            assert!(matches!(err, CoreError::InvalidDuration { .. }));
        }
    }

    #[test]
    fn only_one_session_may_be_active() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);

        let first = manager.start(None, 25).unwrap();
        let err = manager.start(None, 25).unwrap_err();
        assert!(matches!(err, CoreError::SessionAlreadyActive));

        // A terminal session frees the slot.
        manager.cancel(first.id).unwrap();
        manager.start(None, 25).unwrap();
    }

    #[test]
    fn start_rejects_unknown_habit() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);
        let err = manager.start(Some(Uuid::new_v4()), 25).unwrap_err();
        assert!(matches!(err, CoreError::HabitNotFound { .. }));
    }

    #[test]
    fn progress_is_coalesced_and_overwrites() {
        let (db, clock) = setup();
        let manager = SessionManager::with_flush_interval(&db, &clock, 15);
        let session = manager.start(None, 25).unwrap();

        // Below the flush interval: accepted but not written.
        let p = manager.record_progress(session.id, 5).unwrap();
        assert!(!p.persisted);
        assert_eq!(db.get_session(session.id).unwrap().unwrap().duration_secs, 0);

        // Past the interval: written through.
        let p = manager.record_progress(session.id, 20).unwrap();
        assert!(p.persisted);
        assert_eq!(db.get_session(session.id).unwrap().unwrap().duration_secs, 20);

        // Last value wins.
        let p = manager.record_progress(session.id, 40).unwrap();
        assert!(p.persisted);
        assert_eq!(p.session.duration_secs, 40);
    }

    #[test]
    fn progress_reports_reached_target() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);
        let session = manager.start(None, 25).unwrap();

        let p = manager.record_progress(session.id, 1499).unwrap();
        assert!(!p.reached_target);
        let p = manager.record_progress(session.id, 1500).unwrap();
        assert!(p.reached_target);
    }

    #[test]
    fn late_progress_after_terminal_state_is_rejected() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);

        let session = manager.start(None, 25).unwrap();
        manager.complete(session.id).unwrap();
        let err = manager.record_progress(session.id, 100).unwrap_err();
        assert!(matches!(err, CoreError::SessionNotActive { .. }));

        let err = manager
            .record_progress(Uuid::new_v4(), 100)
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound { .. }));
    }

    #[test]
    fn complete_uses_wall_clock_not_reported_counter() {
        let (db, clock) = setup();
        let habit = Habit::new(
            "Writing",
            vec![ChecklistItem::new("draft")],
            1,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            clock.now(),
        );
        db.create_habit(&habit).unwrap();

        let manager = SessionManager::new(&db, &clock);
        let session = manager.start(Some(habit.id), 25).unwrap();

        // The client under-reported; the wall clock is authoritative.
        manager.record_progress(session.id, 60).unwrap();
        clock.advance_secs(1500);
        let completed = manager.complete(session.id).unwrap();

        assert_eq!(completed.status, SessionStatus::Completed);
        assert_eq!(completed.duration_secs, 1500);
        assert_eq!(completed.ended_at, Some(clock.now()));

        let stats = db.stats_for(habit.id, clock.today()).unwrap().unwrap();
        assert_eq!(stats.total_pomodoros, 1);
        assert_eq!(stats.total_duration_secs, 1500);
    }

    #[test]
    fn terminal_transitions_happen_exactly_once() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);

        let session = manager.start(None, 25).unwrap();
        manager.complete(session.id).unwrap();
        assert!(matches!(
            manager.complete(session.id).unwrap_err(),
            CoreError::SessionNotActive { .. }
        ));
        assert!(matches!(
            manager.cancel(session.id).unwrap_err(),
            CoreError::SessionNotActive { .. }
        ));
    }

    #[test]
    fn sessions_without_habit_produce_no_events() {
        let (db, clock) = setup();
        let manager = SessionManager::new(&db, &clock);

        let session = manager.start(None, 25).unwrap();
        clock.advance_secs(300);
        manager.complete(session.id).unwrap();

        let today = clock.today();
        let range = db.query_range(today, today, None).unwrap();
        assert!(range.is_empty());
    }
}
