//! Time Log Ledger: the authoritative record of timing sessions.
//!
//! Every transition runs inside one write-locking transaction, so the
//! exclusivity check and the write that depends on it are a single step
//! no matter how many terminals share the database file.

use crate::config::Config;
use crate::core::clock::{Clock, SystemClock};
use crate::core::cost::{CostAggregator, SqliteRates, WorkOrderCost};
use crate::core::resolver::{self, active_log, conflict};
use crate::db::log::audit;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::task::Task;
use crate::models::time_log::{LogStatus, TimeLog};
use crate::models::views::{ActiveLog, BoardEntry, BoardView, WorkerView};
use crate::models::worker::Worker;
use crate::utils::time::{elapsed_seconds, truncate_to_seconds};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Ledger {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
}

fn require_worker(conn: &Connection, worker_id: &str) -> AppResult<Worker> {
    queries::get_worker(conn, worker_id)?
        .ok_or_else(|| AppError::NotFound(format!("worker {worker_id}")))
}

fn require_task(conn: &Connection, task_id: &str) -> AppResult<Task> {
    queries::get_task(conn, task_id)?.ok_or_else(|| AppError::NotFound(format!("task {task_id}")))
}

fn require_log(conn: &Connection, log_id: i64) -> AppResult<TimeLog> {
    queries::get_time_log(conn, log_id)?
        .ok_or_else(|| AppError::NotFound(format!("time log #{log_id}")))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Persist `log` only if the stored row still has status `expected`.
fn write_transition(
    conn: &Connection,
    log: &TimeLog,
    expected: LogStatus,
    action: &'static str,
) -> AppResult<()> {
    if queries::update_time_log(conn, log, expected)? == 1 {
        return Ok(());
    }
    // The row moved underneath us; report what it is now.
    let current = require_log(conn, log.id)?;
    Err(AppError::InvalidState {
        log_id: log.id,
        status: current.status,
        action,
    })
}

impl Ledger {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            stale_after: Duration::minutes(720),
        }
    }

    /// Open the configured database with the wall clock.
    pub fn open(cfg: &Config) -> AppResult<Self> {
        let pool = DbPool::new(&cfg.database, cfg.busy_timeout_ms)?;
        Ok(Self::new(pool, Arc::new(SystemClock)).with_stale_after(cfg.stale_after()))
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> AppResult<Self> {
        Ok(Self::new(DbPool::in_memory()?, clock))
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn conn(&self) -> &Connection {
        &self.pool.conn
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// "now" as it is persisted: whole seconds.
    fn stamp(&self) -> DateTime<Utc> {
        truncate_to_seconds(self.clock.now())
    }

    /// Consistent read snapshot for multi-query projections.
    fn read_tx(&self) -> AppResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.pool.conn,
            TransactionBehavior::Deferred,
        )?)
    }

    // ------------------------------------------------
    // Transitions
    // ------------------------------------------------

    /// Open a new in_progress log for `worker_id` on `task_id`.
    pub fn start(&mut self, task_id: &str, worker_id: &str) -> AppResult<TimeLog> {
        let now = self.stamp();

        let log = self.pool.write_tx(|tx| {
            require_worker(tx, worker_id)?;
            let task = require_task(tx, task_id)?;
            if task.is_finished() {
                return Err(AppError::TaskFinished(task.id));
            }

            if let Some(open) = active_log(tx, worker_id)? {
                return Err(conflict(&open));
            }

            let mut log = TimeLog {
                id: 0,
                task_id: task_id.to_string(),
                worker_id: worker_id.to_string(),
                started_at: now,
                status: LogStatus::InProgress,
                duration_seconds: 0,
                ended_at: None,
                created_at: now,
            };

            log.id = match queries::insert_time_log(tx, &log) {
                Ok(id) => id,
                Err(e) if is_unique_violation(&e) => {
                    return Err(match active_log(tx, worker_id)? {
                        Some(open) => conflict(&open),
                        None => AppError::Db(e),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            audit(
                tx,
                now,
                "start",
                &format!("log #{}", log.id),
                &format!("{worker_id} started {task_id}"),
            )?;
            Ok(log)
        })?;

        info!(worker_id, task_id, log_id = log.id, "time log started");
        Ok(log)
    }

    /// Accrue the running interval and park the log.
    pub fn pause(&mut self, log_id: i64) -> AppResult<TimeLog> {
        let now = self.stamp();

        let log = self.pool.write_tx(|tx| {
            let mut log = require_log(tx, log_id)?;
            if log.status != LogStatus::InProgress {
                return Err(AppError::InvalidState {
                    log_id,
                    status: log.status,
                    action: "pause",
                });
            }

            let interval = elapsed_seconds(log.started_at, now);
            log.duration_seconds += interval;
            log.status = LogStatus::Paused;
            write_transition(tx, &log, LogStatus::InProgress, "pause")?;

            audit(
                tx,
                now,
                "pause",
                &format!("log #{log_id}"),
                &format!("+{interval}s, total {}s", log.duration_seconds),
            )?;
            Ok(log)
        })?;

        info!(
            worker_id = %log.worker_id,
            log_id,
            duration_seconds = log.duration_seconds,
            "time log paused"
        );
        Ok(log)
    }

    /// Put the worker's paused log on `task_id` back in progress.
    pub fn resume(&mut self, task_id: &str, worker_id: &str) -> AppResult<TimeLog> {
        let now = self.stamp();

        let log = self.pool.write_tx(|tx| {
            require_worker(tx, worker_id)?;
            let task = require_task(tx, task_id)?;
            if task.is_finished() {
                return Err(AppError::TaskFinished(task.id));
            }

            let mut log = match active_log(tx, worker_id)? {
                None => {
                    return Err(AppError::NotFound(format!(
                        "paused log for worker {worker_id} on task {task_id}"
                    )));
                }
                Some(open) if open.task_id != task_id => return Err(conflict(&open)),
                Some(open) if open.status != LogStatus::Paused => {
                    return Err(AppError::InvalidState {
                        log_id: open.id,
                        status: open.status,
                        action: "resume",
                    });
                }
                Some(open) => open,
            };

            log.status = LogStatus::InProgress;
            log.started_at = now;
            write_transition(tx, &log, LogStatus::Paused, "resume")?;

            audit(
                tx,
                now,
                "resume",
                &format!("log #{}", log.id),
                &format!("{worker_id} resumed {task_id} at {}s", log.duration_seconds),
            )?;
            Ok(log)
        })?;

        info!(worker_id, task_id, log_id = log.id, "time log resumed");
        Ok(log)
    }

    /// Close the log for good. The task is closed too once nobody else
    /// holds an open log on it.
    pub fn finish(&mut self, log_id: i64, task_id: &str) -> AppResult<TimeLog> {
        let now = self.stamp();

        let log = self.pool.write_tx(|tx| {
            let mut log = require_log(tx, log_id)?;
            if log.task_id != task_id {
                return Err(AppError::NotFound(format!(
                    "time log #{log_id} on task {task_id}"
                )));
            }
            if !log.is_open() {
                return Err(AppError::InvalidState {
                    log_id,
                    status: log.status,
                    action: "finish",
                });
            }

            let expected = log.status;
            if expected == LogStatus::InProgress {
                log.duration_seconds += elapsed_seconds(log.started_at, now);
            }
            log.status = LogStatus::Finished;
            log.ended_at = Some(now);
            write_transition(tx, &log, expected, "finish")?;

            if queries::open_logs_for_task(tx, task_id)?.is_empty() {
                queries::set_task_finished(tx, task_id, Some(now))?;
            }

            audit(
                tx,
                now,
                "finish",
                &format!("log #{log_id}"),
                &format!("{} finished {task_id}, total {}s", log.worker_id, log.duration_seconds),
            )?;
            Ok(log)
        })?;

        info!(
            worker_id = %log.worker_id,
            task_id,
            log_id,
            duration_seconds = log.duration_seconds,
            "time log finished"
        );
        Ok(log)
    }

    // ------------------------------------------------
    // Reads
    // ------------------------------------------------

    /// The worker's single open log (in_progress or paused), if any.
    pub fn active_log(&self, worker_id: &str) -> AppResult<Option<TimeLog>> {
        active_log(self.conn(), worker_id)
    }

    /// The worker's pending tasks. Tasks with an open log are excluded.
    pub fn tasks_by_worker(&self, worker_id: &str) -> AppResult<Vec<Task>> {
        let tx = self.read_tx()?;
        require_worker(&tx, worker_id)?;
        let active = active_log(&tx, worker_id)?;
        let tasks = queries::tasks_for_worker(&tx, worker_id)?;
        tx.commit()?;
        Ok(resolver::pending_tasks(tasks, active.as_ref()))
    }

    pub fn get_log(&self, log_id: i64) -> AppResult<TimeLog> {
        require_log(self.conn(), log_id)
    }

    pub fn get_task(&self, task_id: &str) -> AppResult<Task> {
        require_task(self.conn(), task_id)
    }

    /// Every open log in the workshop, checked against the exclusivity invariant.
    pub fn open_logs(&self) -> AppResult<Vec<TimeLog>> {
        let open = queries::open_logs(self.conn())?;
        resolver::check_exclusive(&open)?;
        Ok(open)
    }

    pub fn logs_for_work_order(&self, work_order_id: &str) -> AppResult<Vec<TimeLog>> {
        queries::logs_for_work_order(self.conn(), work_order_id)
    }

    pub fn logs_for_task(&self, task_id: &str) -> AppResult<Vec<TimeLog>> {
        queries::logs_for_task(self.conn(), task_id)
    }

    /// in_progress logs whose current interval exceeds the staleness bound.
    /// They are only reported; closing them takes an explicit pause or finish.
    pub fn stale_logs(&self) -> AppResult<Vec<TimeLog>> {
        let now = self.now();
        Ok(self
            .open_logs()?
            .into_iter()
            .filter(|l| l.is_stale(now, self.stale_after))
            .collect())
    }

    // ------------------------------------------------
    // Projections
    // ------------------------------------------------

    /// Active log and pending list read from one snapshot, so a task can
    /// never show up in both.
    pub fn worker_view(&self, worker_id: &str) -> AppResult<WorkerView> {
        let now = self.now();
        let tx = self.read_tx()?;

        require_worker(&tx, worker_id)?;
        let active = active_log(&tx, worker_id)?;
        let tasks = queries::tasks_for_worker(&tx, worker_id)?;

        let active = match active {
            Some(log) => {
                let task = queries::get_task(&tx, &log.task_id)?;
                let stale = log.is_stale(now, self.stale_after);
                if stale {
                    warn!(worker_id, log_id = log.id, task_id = %log.task_id, "stale in_progress log");
                }
                Some(ActiveLog {
                    live_seconds: log.live_duration(now),
                    stale,
                    task,
                    log,
                })
            }
            None => None,
        };
        tx.commit()?;

        let pending = resolver::pending_tasks(tasks, active.as_ref().map(|a| &a.log));

        Ok(WorkerView {
            worker_id: worker_id.to_string(),
            active,
            pending,
            refreshed_at: now,
        })
    }

    /// Who is working on what right now. Recomputed from the ledger on every
    /// call; nothing about it is cached.
    pub fn board_view(&self) -> AppResult<BoardView> {
        let now = self.now();
        let tx = self.read_tx()?;

        let open = queries::open_logs(&tx)?;
        resolver::check_exclusive(&open)?;

        let mut entries = Vec::with_capacity(open.len());
        for log in open {
            let worker = queries::get_worker(&tx, &log.worker_id)?.ok_or_else(|| {
                AppError::Integrity(format!("log #{} references unknown worker", log.id))
            })?;
            let task = queries::get_task(&tx, &log.task_id)?.ok_or_else(|| {
                AppError::Integrity(format!("log #{} references unknown task", log.id))
            })?;
            let stale = log.is_stale(now, self.stale_after);
            if stale {
                warn!(worker_id = %log.worker_id, log_id = log.id, "stale in_progress log");
            }
            entries.push(BoardEntry {
                live_seconds: log.live_duration(now),
                stale,
                worker,
                task,
                log,
            });
        }
        tx.commit()?;

        Ok(BoardView {
            entries,
            refreshed_at: now,
        })
    }

    // ------------------------------------------------
    // Cost
    // ------------------------------------------------

    /// Labor cost of a work order as of now, rates from the hourly_rates table.
    pub fn work_order_cost(&self, work_order_id: &str, default_rate: f64) -> AppResult<WorkOrderCost> {
        let mut agg = CostAggregator::new(self.conn(), SqliteRates::new(self.conn()), default_rate);
        agg.work_order_cost(work_order_id, self.now())
    }
}
