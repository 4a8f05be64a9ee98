//! Active-state resolution: the single open log per worker.

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::task::Task;
use crate::models::time_log::TimeLog;
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Reduce a worker's open rows to at most one log.
///
/// Two or more open rows for the same worker are never merged or picked
/// from: the caller gets an Integrity error naming every offending log.
pub fn resolve_active(worker_id: &str, open: Vec<TimeLog>) -> AppResult<Option<TimeLog>> {
    let mut mine: Vec<TimeLog> = open
        .into_iter()
        .filter(|l| l.worker_id == worker_id && l.is_open())
        .collect();

    match mine.len() {
        0 => Ok(None),
        1 => Ok(mine.pop()),
        _ => Err(AppError::Integrity(format!(
            "worker {} has {} open logs: {}",
            worker_id,
            mine.len(),
            describe(&mine)
        ))),
    }
}

/// The worker's open log straight from storage.
pub fn active_log(conn: &Connection, worker_id: &str) -> AppResult<Option<TimeLog>> {
    resolve_active(worker_id, queries::open_logs_for_worker(conn, worker_id)?)
}

/// Conflict error for a worker whose slot is taken by `open`.
pub fn conflict(open: &TimeLog) -> AppError {
    AppError::Conflict {
        worker_id: open.worker_id.clone(),
        task_id: open.task_id.clone(),
        log_id: open.id,
    }
}

/// Tasks that belong in the "pending" list: never the active one,
/// never one with an open log, never a finished one.
pub fn pending_tasks(tasks: Vec<Task>, active: Option<&TimeLog>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| t.is_pending())
        .filter(|t| active.is_none_or(|a| a.task_id != t.id))
        .collect()
}

/// Check the exclusivity invariant over every open log in the workshop.
pub fn check_exclusive(open: &[TimeLog]) -> AppResult<()> {
    let mut per_worker: BTreeMap<&str, Vec<&TimeLog>> = BTreeMap::new();
    for log in open.iter().filter(|l| l.is_open()) {
        per_worker.entry(log.worker_id.as_str()).or_default().push(log);
    }

    let faults: Vec<String> = per_worker
        .iter()
        .filter(|(_, logs)| logs.len() > 1)
        .map(|(worker, logs)| {
            let ids: Vec<String> = logs.iter().map(|l| format!("#{}", l.id)).collect();
            format!("{} → {}", worker, ids.join(", "))
        })
        .collect();

    if faults.is_empty() {
        Ok(())
    } else {
        Err(AppError::Integrity(format!(
            "workers with more than one open log: {}",
            faults.join("; ")
        )))
    }
}

fn describe(logs: &[TimeLog]) -> String {
    logs.iter()
        .map(|l| format!("#{} ({} on {})", l.id, l.status, l.task_id))
        .collect::<Vec<_>>()
        .join(", ")
}
