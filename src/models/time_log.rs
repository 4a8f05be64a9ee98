use crate::utils::time::{elapsed_seconds, period_of};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    InProgress,
    Paused,
    Finished,
}

impl LogStatus {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LogStatus::InProgress => "in_progress",
            LogStatus::Paused => "paused",
            LogStatus::Finished => "finished",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(LogStatus::InProgress),
            "paused" => Some(LogStatus::Paused),
            "finished" => Some(LogStatus::Finished),
            _ => None,
        }
    }

    /// in_progress and paused both hold the worker's single open slot.
    pub fn is_open(&self) -> bool {
        matches!(self, LogStatus::InProgress | LogStatus::Paused)
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// One continuous-or-paused recording of a worker's time on a task.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeLog {
    pub id: i64,
    pub task_id: String,
    pub worker_id: String,
    pub started_at: DateTime<Utc>, // reset on every resume
    pub status: LogStatus,
    pub duration_seconds: i64, // accrued up to the last persistence point
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>, // first start, selects the rate period
}

impl TimeLog {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Seconds of the interval still running, zero unless in_progress.
    pub fn open_interval_seconds(&self, now: DateTime<Utc>) -> i64 {
        if self.status == LogStatus::InProgress {
            elapsed_seconds(self.started_at, now)
        } else {
            0
        }
    }

    /// Authoritative duration as of `now`. Display only, never written back.
    pub fn live_duration(&self, now: DateTime<Utc>) -> i64 {
        self.duration_seconds + self.open_interval_seconds(now)
    }

    /// An in_progress interval running longer than `threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.status == LogStatus::InProgress
            && threshold > Duration::zero()
            && self.open_interval_seconds(now) > threshold.num_seconds()
    }

    /// Rate period (`YYYY-MM`) this log accrues cost in.
    pub fn period(&self) -> String {
        period_of(self.created_at)
    }
}
