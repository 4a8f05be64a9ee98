//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use thiserror::Error;

use crate::models::time_log::LogStatus;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid period: {0} (expected YYYY-MM)")]
    InvalidPeriod(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ---------------------------
    // Ledger errors
    // ---------------------------
    #[error("Worker {worker_id} already has an open log (#{log_id}) on task {task_id}")]
    Conflict {
        worker_id: String,
        task_id: String,
        log_id: i64,
    },

    #[error("Cannot {action} log #{log_id}: status is {status}")]
    InvalidState {
        log_id: i64,
        status: LogStatus,
        action: &'static str,
    },

    #[error("Task {0} is finished; it must be reopened before logging more time")]
    TaskFinished(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data integrity fault: {0}")]
    Integrity(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    #[error("Failed to save configuration")]
    ConfigSave,

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Transient storage failures a read loop may retry.
    /// Ledger rejections (Conflict, InvalidState, NotFound) never qualify.
    pub fn is_retryable_read(&self) -> bool {
        match self {
            AppError::Db(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            AppError::Io(_) => true,
            _ => false,
        }
    }

    /// True for the rejections a worker sees as a blocking message.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::Conflict { .. }
                | AppError::InvalidState { .. }
                | AppError::TaskFinished(_)
                | AppError::NotFound(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
