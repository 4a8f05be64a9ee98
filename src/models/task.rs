use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of a task as seen through the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Finished,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub work_order_id: String,
    pub worker_id: Option<String>, // ⇔ tasks.worker_id (assignment, owned by the registry)
    pub task_type: String,
    pub estimated_hours: f64,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: TaskStatus, // derived from finished_at + open logs, never stored
}

impl Task {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}
