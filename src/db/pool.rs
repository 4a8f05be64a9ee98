//! SQLite connection wrapper (one per terminal / process).

use crate::db::initialize::init_db;
use crate::errors::AppResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    /// Open the database file and bring the schema up to date.
    pub fn new(path: &str, busy_timeout_ms: u64) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        Self::prepare(conn, busy_timeout_ms, true)
    }

    /// In-memory database with the full schema.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, 0, false)
    }

    fn prepare(conn: Connection, busy_timeout_ms: u64, wal: bool) -> AppResult<Self> {
        // Concurrent terminals wait for the writer instead of failing fast.
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        if wal {
            conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Run `func` inside a write-locking transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the database write lock before the first read,
    /// so a check and the write that depends on it cannot interleave with
    /// another connection's. Commits on Ok, rolls back on Err.
    pub fn write_tx<F, T>(&mut self, func: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = func(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
