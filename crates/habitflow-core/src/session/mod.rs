//! Focus (pomodoro) sessions.
//!
//! A session is a timed work interval optionally linked to a habit. The
//! state machine is `Active -> {Completed, Cancelled}`; both end states are
//! terminal and a session is never reactivated.

mod manager;
mod ticker;

pub use manager::{Progress, SessionManager};
pub use ticker::{SessionTicker, TickerOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest accepted session target, in minutes.
pub const MIN_TARGET_MINUTES: u32 = 5;
/// Largest accepted session target, in minutes.
pub const MAX_TARGET_MINUTES: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

/// A single focus session.
///
/// `duration_secs` is a client-reported progress counter while the session
/// is active; on completion it is overwritten with the authoritative
/// wall-clock elapsed time (`ended_at - started_at`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: Uuid,
    pub habit_id: Option<Uuid>,
    pub status: SessionStatus,
    pub target_secs: u64,
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl FocusSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn remaining_secs(&self) -> u64 {
        self.target_secs.saturating_sub(self.duration_secs)
    }

    /// 0.0 .. 1.0 progress toward the target.
    pub fn progress(&self) -> f64 {
        if self.target_secs == 0 {
            return 0.0;
        }
        (self.duration_secs as f64 / self.target_secs as f64).min(1.0)
    }
}
