//! Cancellable per-session ticker.
//!
//! The scheduled callback assumed by the concurrency model: a tokio task
//! keyed by one session id that periodically records wall-clock progress
//! and invokes `complete` once the target is reached. The task is abortable,
//! and a tick that observes a terminal session exits silently -- a dangling
//! timer is a no-op, never an error.

use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::session::{FocusSession, SessionManager};
use crate::storage::Database;

/// How a ticker run ended.
#[derive(Debug)]
pub enum TickerOutcome {
    /// The target was reached and the session was completed by the ticker.
    Completed(FocusSession),
    /// The session reached a terminal state through another caller.
    AlreadyEnded,
    /// The ticker task was aborted before the session ended.
    Aborted,
}

/// A spawned ticker driving one session toward auto-completion.
pub struct SessionTicker {
    session_id: Uuid,
    handle: JoinHandle<Result<TickerOutcome>>,
}

impl SessionTicker {
    /// Spawn a ticker for `session_id`.
    ///
    /// The ticker owns its database handle; callers keep their own. Each
    /// tick reports `now - started_at` as the elapsed counter (persisted
    /// with the manager's write coalescing) and completes the session once
    /// the target is reached.
    pub fn spawn<C>(db: Database, clock: C, session_id: Uuid, tick: Duration) -> Self
    where
        C: Clock + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let session = match db.get_session(session_id)? {
                Some(s) if s.is_active() => s,
                Some(_) => return Ok(TickerOutcome::AlreadyEnded),
                None => return Err(CoreError::SessionNotFound { id: session_id }),
            };

            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                // Rebuilt each tick so the manager's borrows of `db`/`clock`
                // are never held across the await above -- keeping the spawned
                // future `Send`. The manager is a stateless view, so this is
                // behavior-identical to holding one for the whole loop.
                let manager = SessionManager::new(&db, &clock);
                let elapsed = manager.elapsed_secs(&session);
                match manager.record_progress(session_id, elapsed) {
                    Ok(progress) if progress.reached_target => {
                        let completed = manager.complete(session_id)?;
                        return Ok(TickerOutcome::Completed(completed));
                    }
                    Ok(_) => {}
                    Err(CoreError::SessionNotActive { .. })
                    | Err(CoreError::SessionNotFound { .. }) => {
                        debug!("ticker for session {session_id} found it ended; stopping");
                        return Ok(TickerOutcome::AlreadyEnded);
                    }
                    Err(err) => return Err(err),
                }
            }
        });
        Self { session_id, handle }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Stop scheduling ticks. The session itself is untouched; cancel it
    /// through the manager.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the ticker to finish.
    pub async fn wait(&mut self) -> Result<TickerOutcome> {
        match (&mut self.handle).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => Ok(TickerOutcome::Aborted),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use tokio::time::timeout;

    use crate::clock::FixedClock;

    const WAIT: Duration = Duration::from_secs(5);
    const TICK: Duration = Duration::from_millis(10);

    fn shared_db() -> (tempfile::TempDir, Database, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habitflow.db");
        let a = Database::open_at(&path).unwrap();
        let b = Database::open_at(&path).unwrap();
        (dir, a, b)
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::at_day(
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        ))
    }

    #[tokio::test]
    async fn ticker_completes_session_at_deadline() {
        let (_dir, db, ticker_db) = shared_db();
        let clock = clock();
        let manager = SessionManager::new(&db, clock.clone());
        let session = manager.start(None, 5).unwrap();

        // The target is already in the past when the first tick fires.
        clock.advance_secs(301);
        let mut ticker = SessionTicker::spawn(ticker_db, clock.clone(), session.id, TICK);

        let outcome = timeout(WAIT, ticker.wait()).await.unwrap().unwrap();
        match outcome {
            TickerOutcome::Completed(done) => {
                assert_eq!(done.duration_secs, 301);
                assert!(done.ended_at.is_some());
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(db.active_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_ticker_is_a_noop_after_external_cancel() {
        let (_dir, db, ticker_db) = shared_db();
        let clock = clock();
        let manager = SessionManager::new(&db, clock.clone());
        let session = manager.start(None, 25).unwrap();

        let mut ticker = SessionTicker::spawn(ticker_db, clock.clone(), session.id, TICK);
        // Let a few ticks land first.
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.cancel(session.id).unwrap();

        let outcome = timeout(WAIT, ticker.wait()).await.unwrap().unwrap();
        assert!(matches!(outcome, TickerOutcome::AlreadyEnded));
    }

    #[tokio::test]
    async fn aborted_ticker_leaves_the_session_active() {
        let (_dir, db, ticker_db) = shared_db();
        let clock = clock();
        let manager = SessionManager::new(&db, clock.clone());
        let session = manager.start(None, 25).unwrap();

        let mut ticker = SessionTicker::spawn(ticker_db, clock.clone(), session.id, TICK);
        ticker.abort();
        let outcome = timeout(WAIT, ticker.wait()).await.unwrap().unwrap();
        assert!(matches!(outcome, TickerOutcome::Aborted));

        // Cancellation of the schedule does not end the session.
        assert!(db.active_session().unwrap().is_some());
        manager.cancel(session.id).unwrap();
    }
}
