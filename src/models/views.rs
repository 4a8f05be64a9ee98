//! Read-only projections recomputed from the ledger on every refresh.

use super::{
    task::Task,
    time_log::{LogStatus, TimeLog},
    worker::Worker,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The worker's open log plus the display values derived at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveLog {
    pub log: TimeLog,
    pub task: Option<Task>,
    pub live_seconds: i64,
    pub stale: bool,
}

/// What a worker's panel shows: the active log and the pending list.
/// A task never appears in both.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerView {
    pub worker_id: String,
    pub active: Option<ActiveLog>,
    pub pending: Vec<Task>,
    pub refreshed_at: DateTime<Utc>,
}

impl WorkerView {
    pub fn can_start(&self) -> bool {
        self.active.is_none()
    }

    pub fn can_pause(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.log.status == LogStatus::InProgress)
    }

    pub fn can_resume(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.log.status == LogStatus::Paused)
    }
}

/// One row of the workshop-wide "who is working on what now" board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    pub worker: Worker,
    pub task: Task,
    pub log: TimeLog,
    pub live_seconds: i64,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub entries: Vec<BoardEntry>,
    pub refreshed_at: DateTime<Utc>,
}

impl BoardView {
    /// The open log currently claiming `task_id`, if any.
    pub fn claimed_by(&self, task_id: &str) -> Option<&BoardEntry> {
        self.entries.iter().find(|e| e.task.id == task_id)
    }

    pub fn stale_count(&self) -> usize {
        self.entries.iter().filter(|e| e.stale).count()
    }
}
