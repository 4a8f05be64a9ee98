use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::info;

/// Ensure that the `log` table exists. Applied migrations are recorded in it.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Ordered schema migrations: (version, description, SQL).
const MIGRATIONS: &[(&str, &str, &str)] = &[
    (
        "20250301_0001_registry_tables",
        "Created workers, work_orders and tasks tables",
        r#"
        CREATE TABLE IF NOT EXISTS workers (
            id               TEXT PRIMARY KEY,
            name             TEXT NOT NULL,
            role             TEXT NOT NULL DEFAULT 'operator',
            productive       INTEGER NOT NULL DEFAULT 1,
            productivity_pct INTEGER CHECK(productivity_pct BETWEEN 0 AND 100)
        );

        CREATE TABLE IF NOT EXISTS work_orders (
            id          TEXT PRIMARY KEY,
            workshop_id TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id              TEXT PRIMARY KEY,
            work_order_id   TEXT NOT NULL REFERENCES work_orders(id),
            worker_id       TEXT REFERENCES workers(id),
            task_type       TEXT NOT NULL,
            estimated_hours REAL NOT NULL DEFAULT 0,
            finished_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_worker ON tasks(worker_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_order ON tasks(work_order_id);
        "#,
    ),
    (
        "20250301_0002_time_logs",
        "Created time_logs table with one-open-log-per-worker index",
        r#"
        CREATE TABLE IF NOT EXISTS time_logs (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id          TEXT NOT NULL REFERENCES tasks(id),
            worker_id        TEXT NOT NULL REFERENCES workers(id),
            started_at       TEXT NOT NULL,
            status           TEXT NOT NULL CHECK(status IN ('in_progress','paused','finished')),
            duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK(duration_seconds >= 0),
            ended_at         TEXT,
            created_at       TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_time_logs_one_open
            ON time_logs(worker_id) WHERE status IN ('in_progress','paused');
        CREATE INDEX IF NOT EXISTS idx_time_logs_task ON time_logs(task_id);
        "#,
    ),
    (
        "20250315_0003_hourly_rates",
        "Created hourly_rates and rate_snapshots tables",
        r#"
        CREATE TABLE IF NOT EXISTS hourly_rates (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            workshop_id TEXT NOT NULL,
            period      TEXT NOT NULL,
            rate        REAL NOT NULL CHECK(rate >= 0),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_hourly_rates_key ON hourly_rates(workshop_id, period);

        CREATE TABLE IF NOT EXISTS rate_snapshots (
            workshop_id TEXT NOT NULL,
            period      TEXT NOT NULL,
            rate        REAL NOT NULL,
            resolved_at TEXT NOT NULL,
            PRIMARY KEY (workshop_id, period)
        );
        "#,
    ),
];

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, version: &str, description: &str, sql: &str) -> AppResult<()> {
    conn.execute_batch(sql)
        .map_err(|e| AppError::Migration(format!("{version}: {e}")))?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%SZ','now'), 'migration_applied', ?1, ?2)",
        [version, description],
    )?;

    info!(version, "migration applied");
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked by db::init_db() every time a connection is opened.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    // Two terminals opening a fresh file at once must not both apply a step.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    ensure_log_table(&tx)?;

    for (version, description, sql) in MIGRATIONS {
        if !is_applied(&tx, version)? {
            apply(&tx, version, description, sql)?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Versions recorded as applied, oldest first.
pub fn applied_versions(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
