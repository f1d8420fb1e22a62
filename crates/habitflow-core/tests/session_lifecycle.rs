//! End-to-end lifecycle tests over a real database file.
//!
//! These exercise the complete flow the API layer drives: start a session,
//! report progress, complete, and observe the event log and rollups move
//! together.

use chrono::NaiveDate;

use habitflow_core::{
    ChecklistItem, Clock, CoreError, Database, FixedClock, Habit, SessionManager, SessionStatus,
    StreakCalculator,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn checklist(labels: &[&str]) -> Vec<ChecklistItem> {
    labels.iter().map(|l| ChecklistItem::new(*l)).collect()
}

#[test]
fn full_session_flow_updates_log_and_rollups() {
    let db = Database::open_memory().unwrap();
    let clock = FixedClock::at_day(day(2026, 2, 1));

    let habit = Habit::new(
        "Deep work",
        checklist(&["plan", "execute"]),
        1,
        day(2026, 1, 1),
        clock.now(),
    );
    db.create_habit(&habit).unwrap();

    let manager = SessionManager::new(&db, &clock);
    let session = manager.start(Some(habit.id), 25).unwrap();
    assert_eq!(session.target_secs, 1500);
    assert!(session.is_active());

    // Periodic progress reports, then the deadline.
    for elapsed in [300, 600, 900, 1200] {
        clock.advance_secs(300);
        let progress = manager.record_progress(session.id, elapsed).unwrap();
        assert!(!progress.reached_target);
    }
    clock.advance_secs(300);
    let progress = manager.record_progress(session.id, 1500).unwrap();
    assert!(progress.reached_target);

    let completed = manager.complete(session.id).unwrap();
    assert_eq!(completed.status, SessionStatus::Completed);
    assert_eq!(completed.duration_secs, 1500);

    let today = clock.today();
    let stats = db.stats_for(habit.id, today).unwrap().unwrap();
    assert_eq!(stats.total_pomodoros, 1);
    assert_eq!(stats.total_duration_secs, 1500);

    let range = db.query_range(today, today, Some(habit.id)).unwrap();
    assert_eq!(range.len(), 1);
    assert_eq!(range[0].events.len(), 1);
    assert_eq!(range[0].events[0].duration_secs, Some(1500));
}

#[test]
fn checklist_days_and_streaks_line_up() {
    let db = Database::open_memory().unwrap();
    let clock = FixedClock::at_day(day(2026, 2, 1));

    let habit = Habit::new(
        "Morning routine",
        checklist(&["water", "stretch", "plan"]),
        2,
        day(2026, 1, 1),
        clock.now(),
    );
    db.create_habit(&habit).unwrap();

    // Complete three consecutive days by checking two of three items.
    for d in [day(2026, 2, 1), day(2026, 2, 2), day(2026, 2, 3)] {
        let now = d.and_hms_opt(7, 30, 0).unwrap().and_utc();
        db.toggle_checklist_item(habit.id, habit.checklist[0].id, d, now)
            .unwrap();
        let out = db
            .toggle_checklist_item(habit.id, habit.checklist[1].id, d, now)
            .unwrap();
        assert!(out.is_complete);
    }

    let calc = StreakCalculator::new(&db);
    assert_eq!(calc.current_streak(day(2026, 2, 3)).unwrap(), 3);
    // The day after the last completion: the run still counts, today pending.
    assert_eq!(calc.current_streak(day(2026, 2, 4)).unwrap(), 3);
    // Once a whole day has been missed the chain is broken.
    assert_eq!(calc.current_streak(day(2026, 2, 5)).unwrap(), 0);

    // The day view agrees with the log.
    let overview = db.query_day(day(2026, 2, 2)).unwrap();
    assert!(overview.all_complete());
}

#[test]
fn cancelled_sessions_leave_no_trace_in_statistics() {
    let db = Database::open_memory().unwrap();
    let clock = FixedClock::at_day(day(2026, 2, 1));
    let habit = Habit::new(
        "Deep work",
        checklist(&["go"]),
        1,
        day(2026, 1, 1),
        clock.now(),
    );
    db.create_habit(&habit).unwrap();

    let manager = SessionManager::new(&db, &clock);
    let session = manager.start(Some(habit.id), 25).unwrap();
    clock.advance_secs(600);
    manager.cancel(session.id).unwrap();

    assert!(db.stats_for(habit.id, clock.today()).unwrap().is_none());
    assert!(db
        .query_range(clock.today(), clock.today(), None)
        .unwrap()
        .is_empty());

    // And the slot is free again.
    manager.start(None, 25).unwrap();
}

#[test]
fn direct_event_appends_validate_the_habit() {
    let db = Database::open_memory().unwrap();
    let clock = FixedClock::at_day(day(2026, 2, 1));

    let err = db
        .append_habit_event(uuid::Uuid::new_v4(), clock.today(), true, clock.now())
        .unwrap_err();
    assert!(matches!(err, CoreError::HabitNotFound { .. }));

    let err = db
        .append_pomodoro_event(uuid::Uuid::new_v4(), clock.today(), 60, clock.now())
        .unwrap_err();
    assert!(matches!(err, CoreError::HabitNotFound { .. }));
}
