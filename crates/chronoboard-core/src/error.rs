//! Error types for chronoboard-core.
//!
//! Store failures surface as [`DatabaseError`], rejected caller input as
//! [`ValidationError`], and settings problems as [`ConfigError`]. All of
//! them fold into [`CoreError`], which is what the public API returns.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("storage: {0}")]
    Database(#[from] DatabaseError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else, already formatted for display.
    #[error("{0}")]
    Custom(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("cannot open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{0}")]
    QueryFailed(String),

    #[error("schema upgrade failed: {0}")]
    MigrationFailed(String),

    /// Another writer held the database past the busy timeout.
    #[error("database is busy, try again")]
    Locked,

    /// A thread panicked while holding the connection.
    #[error("connection unusable after a panic in another writer")]
    Poisoned,

    /// A blocking job on the async facade did not finish.
    #[error("background job aborted: {0}")]
    TaskJoin(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("cannot write {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("bad value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("data directory unavailable: {0}")]
    DataDir(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(String),

    #[error("Invalid time range: end {end} precedes start {start}")]
    InvalidTimeRange {
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    #[error("bad {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        let busy = matches!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        );
        if busy {
            DatabaseError::Locked
        } else {
            DatabaseError::QueryFailed(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        DatabaseError::TaskJoin(err.to_string()).into()
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
