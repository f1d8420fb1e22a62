//! Concurrency and additivity properties of the statistics rollups.
//!
//! The interesting cases need two real connections racing on one database
//! file, so these run against tempfile-backed databases rather than
//! in-memory ones.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use proptest::prelude::*;

use habitflow_core::{
    ChecklistItem, CoreError, Database, FixedClock, Habit, SessionManager, StatsDelta,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn file_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habitflow.db");
    (dir, path)
}

fn seeded_habit(db: &Database) -> Habit {
    let habit = Habit::new(
        "Deep work",
        vec![ChecklistItem::new("go")],
        1,
        day(2026, 1, 1),
        day(2026, 1, 1).and_hms_opt(8, 0, 0).unwrap().and_utc(),
    );
    db.create_habit(&habit).unwrap();
    habit
}

#[test]
fn parallel_upserts_lose_no_increments() {
    let (_dir, path) = file_db();
    let db = Database::open_at(&path).unwrap();
    let habit = seeded_habit(&db);
    let d = day(2026, 2, 1);

    const THREADS: usize = 4;
    const PER_THREAD: usize = 25;

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            let habit_id = habit.id;
            thread::spawn(move || {
                let db = Database::open_at(&path).unwrap();
                barrier.wait();
                for _ in 0..PER_THREAD {
                    db.upsert_daily_stats(habit_id, d, StatsDelta::Pomodoro { duration_secs: 60 })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = db.stats_for(habit.id, d).unwrap().unwrap();
    assert_eq!(stats.total_pomodoros, (THREADS * PER_THREAD) as u64);
    assert_eq!(stats.total_duration_secs, (THREADS * PER_THREAD * 60) as u64);
}

#[test]
fn concurrent_starts_admit_exactly_one_session() {
    let (_dir, path) = file_db();
    // Make sure the schema exists before the racers connect.
    let db = Database::open_at(&path).unwrap();
    drop(db);

    const RACERS: usize = 4;
    let barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let db = Database::open_at(&path).unwrap();
                let clock = FixedClock::at_day(day(2026, 2, 1));
                let manager = SessionManager::new(&db, &clock);
                barrier.wait();
                manager.start(None, 25).map(|s| s.id)
            })
        })
        .collect();

    let mut winners = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => winners += 1,
            Err(CoreError::SessionAlreadyActive) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(rejected, RACERS - 1);

    let db = Database::open_at(&path).unwrap();
    assert!(db.active_session().unwrap().is_some());
}

proptest! {
    // N upserts with {total_pomodoros: +1, total_duration_secs: +60} yield
    // exactly N and 60*N regardless of what other deltas are interleaved.
    #[test]
    fn upserts_are_additive_under_any_interleaving(ops in proptest::collection::vec(0u8..3, 1..40)) {
        let db = Database::open_memory().unwrap();
        let habit = seeded_habit(&db);
        let d = day(2026, 2, 1);

        let mut pomodoros = 0u64;
        let mut completed = 0u64;
        let mut failed = 0u64;
        for op in &ops {
            let delta = match op {
                0 => { pomodoros += 1; StatsDelta::Pomodoro { duration_secs: 60 } }
                1 => { completed += 1; StatsDelta::CompletedHabit }
                _ => { failed += 1; StatsDelta::FailedHabit }
            };
            db.upsert_daily_stats(habit.id, d, delta).unwrap();
        }

        let stats = db.stats_for(habit.id, d).unwrap().unwrap();
        prop_assert_eq!(stats.total_pomodoros, pomodoros);
        prop_assert_eq!(stats.total_duration_secs, pomodoros * 60);
        prop_assert_eq!(stats.completed_habits, completed);
        prop_assert_eq!(stats.failed_habits, failed);
    }
}
