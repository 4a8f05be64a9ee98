//! Seed/administration surface for the collaborator-owned records:
//! workers, work orders, tasks and hour-cost calculations.
//! None of these operations touch time logs.

use crate::db::log::audit;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::task::{Task, TaskStatus};
use crate::models::work_order::WorkOrder;
use crate::models::worker::Worker;
use crate::utils::time::parse_period;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub struct RegistryLogic;

fn require_id(kind: &str, id: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{kind} id cannot be empty")));
    }
    Ok(())
}

impl RegistryLogic {
    /// Insert or update a worker in the directory.
    pub fn add_worker(conn: &Connection, worker: &Worker, now: DateTime<Utc>) -> AppResult<()> {
        require_id("worker", &worker.id)?;
        if let Some(p) = worker.productivity_pct
            && p > 100
        {
            return Err(AppError::InvalidInput(format!(
                "productivity must be between 0 and 100, got {p}"
            )));
        }
        queries::insert_worker(conn, worker)?;
        audit(conn, now, "worker", &worker.id, &format!("{} ({})", worker.name, worker.role))?;
        Ok(())
    }

    pub fn add_work_order(
        conn: &Connection,
        id: &str,
        workshop_id: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> AppResult<WorkOrder> {
        require_id("work order", id)?;
        require_id("workshop", workshop_id)?;
        if queries::get_work_order(conn, id)?.is_some() {
            return Err(AppError::InvalidInput(format!("work order {id} already exists")));
        }

        let order = WorkOrder {
            id: id.to_string(),
            workshop_id: workshop_id.to_string(),
            description: description.to_string(),
            created_at: now,
        };
        queries::insert_work_order(conn, &order)?;
        audit(conn, now, "order", id, &format!("workshop {workshop_id}"))?;
        Ok(order)
    }

    pub fn add_task(
        conn: &Connection,
        id: &str,
        work_order_id: &str,
        worker_id: Option<&str>,
        task_type: &str,
        estimated_hours: f64,
        now: DateTime<Utc>,
    ) -> AppResult<Task> {
        require_id("task", id)?;
        if !estimated_hours.is_finite() || estimated_hours < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "estimated hours must be non-negative, got {estimated_hours}"
            )));
        }
        if queries::get_work_order(conn, work_order_id)?.is_none() {
            return Err(AppError::NotFound(format!("work order {work_order_id}")));
        }
        if let Some(w) = worker_id
            && queries::get_worker(conn, w)?.is_none()
        {
            return Err(AppError::NotFound(format!("worker {w}")));
        }
        if queries::get_task(conn, id)?.is_some() {
            return Err(AppError::InvalidInput(format!("task {id} already exists")));
        }

        let task = Task {
            id: id.to_string(),
            work_order_id: work_order_id.to_string(),
            worker_id: worker_id.map(str::to_string),
            task_type: task_type.to_string(),
            estimated_hours,
            finished_at: None,
            status: TaskStatus::Pending,
        };
        queries::insert_task(conn, &task)?;
        audit(conn, now, "task", id, &format!("{task_type} on {work_order_id}"))?;
        Ok(task)
    }

    /// Make a finished task accept new logs again.
    pub fn reopen_task(conn: &Connection, id: &str, now: DateTime<Utc>) -> AppResult<()> {
        let task = queries::get_task(conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("task {id}")))?;
        if !task.is_finished() {
            return Err(AppError::InvalidInput(format!("task {id} is not finished")));
        }
        queries::set_task_finished(conn, id, None)?;
        audit(conn, now, "reopen", id, "task reopened")?;
        Ok(())
    }

    /// Record a new hour-cost calculation. Periods already snapshotted keep
    /// their frozen rate.
    pub fn set_rate(
        conn: &Connection,
        workshop_id: &str,
        period: &str,
        rate: f64,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        require_id("workshop", workshop_id)?;
        let period = parse_period(period).ok_or_else(|| AppError::InvalidPeriod(period.to_string()))?;
        if !rate.is_finite() || rate < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "hourly rate must be non-negative, got {rate}"
            )));
        }
        queries::insert_hourly_rate(conn, workshop_id, &period, rate, now)?;
        audit(conn, now, "rate", &format!("{workshop_id}/{period}"), &format!("{rate}/h"))?;
        Ok(period)
    }
}
