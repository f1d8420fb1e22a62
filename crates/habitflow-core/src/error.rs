//! Core error types for habitflow-core.
//!
//! Every fallible operation surfaces one of these variants to the caller.
//! All errors are local and recoverable: a failed operation leaves prior
//! state untouched (composite writes commit or roll back as a unit).

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Core error type for habitflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session target duration outside the allowed range.
    #[error("invalid session duration: {minutes} minutes (allowed 5..=240)")]
    InvalidDuration { minutes: u32 },

    /// A focus session is already running; at most one may be active.
    #[error("a focus session is already active")]
    SessionAlreadyActive,

    /// No session exists with the given id.
    #[error("session not found: {id}")]
    SessionNotFound { id: Uuid },

    /// The session exists but has reached a terminal state.
    #[error("session {id} is not active")]
    SessionNotActive { id: Uuid },

    /// No habit exists with the given id.
    #[error("habit not found: {id}")]
    HabitNotFound { id: Uuid },

    /// The checklist item is absent from the habit's checklist.
    #[error("checklist item {item} not found on habit {habit}")]
    ItemNotFound { habit: Uuid, item: Uuid },

    /// Database-related errors
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
