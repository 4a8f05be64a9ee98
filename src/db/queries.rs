use crate::errors::{AppError, AppResult};
use crate::models::task::{Task, TaskStatus};
use crate::models::time_log::{LogStatus, TimeLog};
use crate::models::work_order::WorkOrder;
use crate::models::worker::Worker;
use crate::utils::time::{from_db_timestamp, to_db_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::Serialize;

// ------------------------------------------------
// Row mapping
// ------------------------------------------------

fn conversion_error(col: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

fn get_timestamp(row: &Row, col: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    from_db_timestamp(&raw)
        .ok_or_else(|| conversion_error(0, AppError::InvalidInput(format!("bad timestamp '{raw}'"))))
}

fn get_opt_timestamp(row: &Row, col: &str) -> Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(col)? {
        Some(raw) => from_db_timestamp(&raw).map(Some).ok_or_else(|| {
            conversion_error(0, AppError::InvalidInput(format!("bad timestamp '{raw}'")))
        }),
        None => Ok(None),
    }
}

pub fn map_time_log(row: &Row) -> Result<TimeLog> {
    let status_str: String = row.get("status")?;
    let status = LogStatus::from_db_str(&status_str).ok_or_else(|| {
        conversion_error(
            0,
            AppError::InvalidInput(format!("Invalid log status: {}", status_str)),
        )
    })?;

    Ok(TimeLog {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        worker_id: row.get("worker_id")?,
        started_at: get_timestamp(row, "started_at")?,
        status,
        duration_seconds: row.get("duration_seconds")?,
        ended_at: get_opt_timestamp(row, "ended_at")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

/// Expects the extra `has_open` column computed by TASK_SELECT.
pub fn map_task(row: &Row) -> Result<Task> {
    let finished_at = get_opt_timestamp(row, "finished_at")?;
    let has_open: bool = row.get::<_, i64>("has_open")? == 1;

    let status = if finished_at.is_some() {
        TaskStatus::Finished
    } else if has_open {
        TaskStatus::InProgress
    } else {
        TaskStatus::Pending
    };

    Ok(Task {
        id: row.get("id")?,
        work_order_id: row.get("work_order_id")?,
        worker_id: row.get("worker_id")?,
        task_type: row.get("task_type")?,
        estimated_hours: row.get("estimated_hours")?,
        finished_at,
        status,
    })
}

pub fn map_worker(row: &Row) -> Result<Worker> {
    Ok(Worker {
        id: row.get("id")?,
        name: row.get("name")?,
        role: row.get("role")?,
        productive: row.get::<_, i64>("productive")? == 1,
        productivity_pct: row.get::<_, Option<u8>>("productivity_pct")?,
    })
}

pub fn map_work_order(row: &Row) -> Result<WorkOrder> {
    Ok(WorkOrder {
        id: row.get("id")?,
        workshop_id: row.get("workshop_id")?,
        description: row.get("description")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn collect<T>(rows: impl Iterator<Item = Result<T>>) -> AppResult<Vec<T>> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ------------------------------------------------
// Workers
// ------------------------------------------------

pub fn insert_worker(conn: &Connection, w: &Worker) -> AppResult<()> {
    conn.execute(
        "INSERT INTO workers (id, name, role, productive, productivity_pct)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             role = excluded.role,
             productive = excluded.productive,
             productivity_pct = excluded.productivity_pct",
        params![
            w.id,
            w.name,
            w.role,
            if w.productive { 1 } else { 0 },
            w.productivity_pct
        ],
    )?;
    Ok(())
}

pub fn get_worker(conn: &Connection, id: &str) -> AppResult<Option<Worker>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM workers WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_worker).optional()?)
}

pub fn list_workers(conn: &Connection) -> AppResult<Vec<Worker>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM workers ORDER BY id ASC")?;
    collect(stmt.query_map([], map_worker)?)
}

// ------------------------------------------------
// Work orders
// ------------------------------------------------

pub fn insert_work_order(conn: &Connection, wo: &WorkOrder) -> AppResult<()> {
    conn.execute(
        "INSERT INTO work_orders (id, workshop_id, description, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            wo.id,
            wo.workshop_id,
            wo.description,
            to_db_timestamp(wo.created_at)
        ],
    )?;
    Ok(())
}

pub fn get_work_order(conn: &Connection, id: &str) -> AppResult<Option<WorkOrder>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM work_orders WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_work_order).optional()?)
}

// ------------------------------------------------
// Tasks
// ------------------------------------------------

const TASK_SELECT: &str = "SELECT t.*,
        EXISTS(SELECT 1 FROM time_logs l
               WHERE l.task_id = t.id AND l.status IN ('in_progress','paused')) AS has_open
     FROM tasks t";

pub fn insert_task(conn: &Connection, task: &Task) -> AppResult<()> {
    conn.execute(
        "INSERT INTO tasks (id, work_order_id, worker_id, task_type, estimated_hours, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.id,
            task.work_order_id,
            task.worker_id,
            task.task_type,
            task.estimated_hours,
            task.finished_at.map(to_db_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_task(conn: &Connection, id: &str) -> AppResult<Option<Task>> {
    let mut stmt = conn.prepare_cached(&format!("{TASK_SELECT} WHERE t.id = ?1"))?;
    Ok(stmt.query_row([id], map_task).optional()?)
}

pub fn tasks_for_worker(conn: &Connection, worker_id: &str) -> AppResult<Vec<Task>> {
    let mut stmt =
        conn.prepare_cached(&format!("{TASK_SELECT} WHERE t.worker_id = ?1 ORDER BY t.id ASC"))?;
    collect(stmt.query_map([worker_id], map_task)?)
}

pub fn tasks_for_work_order(conn: &Connection, work_order_id: &str) -> AppResult<Vec<Task>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{TASK_SELECT} WHERE t.work_order_id = ?1 ORDER BY t.id ASC"
    ))?;
    collect(stmt.query_map([work_order_id], map_task)?)
}

pub fn list_tasks(conn: &Connection) -> AppResult<Vec<Task>> {
    let mut stmt = conn.prepare_cached(&format!("{TASK_SELECT} ORDER BY t.id ASC"))?;
    collect(stmt.query_map([], map_task)?)
}

pub fn set_task_finished(
    conn: &Connection,
    id: &str,
    finished_at: Option<DateTime<Utc>>,
) -> AppResult<usize> {
    Ok(conn.execute(
        "UPDATE tasks SET finished_at = ?1 WHERE id = ?2",
        params![finished_at.map(to_db_timestamp), id],
    )?)
}

// ------------------------------------------------
// Time logs
// ------------------------------------------------

/// Insert a fresh log and return its id.
pub fn insert_time_log(conn: &Connection, log: &TimeLog) -> Result<i64> {
    conn.execute(
        "INSERT INTO time_logs (task_id, worker_id, started_at, status, duration_seconds, ended_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            log.task_id,
            log.worker_id,
            to_db_timestamp(log.started_at),
            log.status.to_db_str(),
            log.duration_seconds,
            log.ended_at.map(to_db_timestamp),
            to_db_timestamp(log.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Conditional write: applies only while the row still has `expected` status.
/// Returns the number of rows changed (0 means the state moved underneath).
pub fn update_time_log(conn: &Connection, log: &TimeLog, expected: LogStatus) -> AppResult<usize> {
    Ok(conn.execute(
        "UPDATE time_logs
         SET started_at = ?1, status = ?2, duration_seconds = ?3, ended_at = ?4
         WHERE id = ?5 AND status = ?6",
        params![
            to_db_timestamp(log.started_at),
            log.status.to_db_str(),
            log.duration_seconds,
            log.ended_at.map(to_db_timestamp),
            log.id,
            expected.to_db_str(),
        ],
    )?)
}

pub fn get_time_log(conn: &Connection, id: i64) -> AppResult<Option<TimeLog>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM time_logs WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_time_log).optional()?)
}

/// Every open row for a worker. More than one is an integrity fault.
pub fn open_logs_for_worker(conn: &Connection, worker_id: &str) -> AppResult<Vec<TimeLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM time_logs
         WHERE worker_id = ?1 AND status IN ('in_progress','paused')
         ORDER BY id ASC",
    )?;
    collect(stmt.query_map([worker_id], map_time_log)?)
}

pub fn open_logs(conn: &Connection) -> AppResult<Vec<TimeLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM time_logs
         WHERE status IN ('in_progress','paused')
         ORDER BY worker_id ASC, id ASC",
    )?;
    collect(stmt.query_map([], map_time_log)?)
}

pub fn open_logs_for_task(conn: &Connection, task_id: &str) -> AppResult<Vec<TimeLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM time_logs
         WHERE task_id = ?1 AND status IN ('in_progress','paused')
         ORDER BY id ASC",
    )?;
    collect(stmt.query_map([task_id], map_time_log)?)
}

pub fn logs_for_work_order(conn: &Connection, work_order_id: &str) -> AppResult<Vec<TimeLog>> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.* FROM time_logs l
         JOIN tasks t ON t.id = l.task_id
         WHERE t.work_order_id = ?1
         ORDER BY l.id ASC",
    )?;
    collect(stmt.query_map([work_order_id], map_time_log)?)
}

pub fn logs_for_task(conn: &Connection, task_id: &str) -> AppResult<Vec<TimeLog>> {
    let mut stmt =
        conn.prepare_cached("SELECT * FROM time_logs WHERE task_id = ?1 ORDER BY id ASC")?;
    collect(stmt.query_map([task_id], map_time_log)?)
}

pub fn count_time_logs(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM time_logs", [], |row| row.get(0))?)
}

// ------------------------------------------------
// Hourly rates
// ------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RateRow {
    pub workshop_id: String,
    pub period: String,
    pub rate: f64,
    pub created_at: String,
}

pub fn insert_hourly_rate(
    conn: &Connection,
    workshop_id: &str,
    period: &str,
    rate: f64,
    now: DateTime<Utc>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO hourly_rates (workshop_id, period, rate, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![workshop_id, period, rate, to_db_timestamp(now)],
    )?;
    Ok(())
}

/// Rate of the most recent hour-cost calculation for (workshop, period).
pub fn latest_hourly_rate(conn: &Connection, workshop_id: &str, period: &str) -> AppResult<Option<f64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT rate FROM hourly_rates
         WHERE workshop_id = ?1 AND period = ?2
         ORDER BY id DESC
         LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![workshop_id, period], |row| row.get(0))
        .optional()?)
}

pub fn list_hourly_rates(conn: &Connection) -> AppResult<Vec<RateRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT workshop_id, period, rate, created_at FROM hourly_rates
         ORDER BY workshop_id ASC, period ASC, id ASC",
    )?;
    collect(stmt.query_map([], |row| {
        Ok(RateRow {
            workshop_id: row.get(0)?,
            period: row.get(1)?,
            rate: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?)
}

pub fn get_rate_snapshot(conn: &Connection, workshop_id: &str, period: &str) -> AppResult<Option<f64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT rate FROM rate_snapshots WHERE workshop_id = ?1 AND period = ?2",
    )?;
    Ok(stmt
        .query_row(params![workshop_id, period], |row| row.get(0))
        .optional()?)
}

/// Freeze a rate for (workshop, period). An existing snapshot always wins;
/// the frozen value is returned.
pub fn freeze_rate_snapshot(
    conn: &Connection,
    workshop_id: &str,
    period: &str,
    rate: f64,
    now: DateTime<Utc>,
) -> AppResult<f64> {
    conn.execute(
        "INSERT OR IGNORE INTO rate_snapshots (workshop_id, period, rate, resolved_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![workshop_id, period, rate, to_db_timestamp(now)],
    )?;
    get_rate_snapshot(conn, workshop_id, period)?
        .ok_or_else(|| AppError::Integrity(format!("rate snapshot {workshop_id}/{period} vanished")))
}
