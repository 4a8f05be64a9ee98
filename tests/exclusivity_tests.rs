use chrono::Duration;
use shoplog::core::clock::SystemClock;
use shoplog::core::ledger::Ledger;
use shoplog::core::resolver::{check_exclusive, resolve_active};
use shoplog::db::pool::DbPool;
use shoplog::db::queries;
use shoplog::errors::AppError;
use shoplog::models::time_log::{LogStatus, TimeLog};
use std::sync::{Arc, Barrier};
use std::thread;

mod common;
use common::{manual_ledger, seed, setup_test_db, t0};

fn open_log(id: i64, worker: &str, task: &str, status: LogStatus) -> TimeLog {
    TimeLog {
        id,
        task_id: task.to_string(),
        worker_id: worker.to_string(),
        started_at: t0(),
        status,
        duration_seconds: 0,
        ended_at: None,
        created_at: t0(),
    }
}

#[test]
fn start_while_another_log_is_open_is_conflict() {
    let (mut ledger, clock) = manual_ledger();
    seed(&ledger);

    let t1 = ledger.start("T1", "E1").unwrap();
    clock.advance(Duration::minutes(5));

    match ledger.start("T2", "E1") {
        Err(AppError::Conflict {
            worker_id,
            task_id,
            log_id,
        }) => {
            assert_eq!(worker_id, "E1");
            assert_eq!(task_id, "T1");
            assert_eq!(log_id, t1.id);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    // T1's log is untouched and still the only one.
    assert_eq!(ledger.get_log(t1.id).unwrap(), t1);
    assert_eq!(queries::count_time_logs(ledger.conn()).unwrap(), 1);
}

#[test]
fn paused_log_still_holds_the_slot() {
    let (mut ledger, _clock) = manual_ledger();
    seed(&ledger);

    let t1 = ledger.start("T1", "E1").unwrap();
    ledger.pause(t1.id).unwrap();

    assert!(matches!(ledger.start("T2", "E1"), Err(AppError::Conflict { .. })));
    // Same task too: the paused log must be resumed, not duplicated.
    assert!(matches!(ledger.start("T1", "E1"), Err(AppError::Conflict { .. })));
}

#[test]
fn other_workers_are_independent() {
    let (mut ledger, _clock) = manual_ledger();
    seed(&ledger);

    ledger.start("T1", "E1").unwrap();
    ledger.start("T3", "E2").unwrap();

    let board = ledger.board_view().unwrap();
    assert_eq!(board.entries.len(), 2);
    assert_eq!(board.claimed_by("T3").unwrap().worker.id, "E2");
    assert!(board.claimed_by("T2").is_none());
}

#[test]
fn slot_frees_up_after_finish() {
    let (mut ledger, _clock) = manual_ledger();
    seed(&ledger);

    let t1 = ledger.start("T1", "E1").unwrap();
    ledger.finish(t1.id, "T1").unwrap();
    ledger.start("T2", "E1").expect("slot is free again");
}

#[test]
fn storage_rejects_a_second_open_row() {
    let (mut ledger, _clock) = manual_ledger();
    seed(&ledger);
    ledger.start("T1", "E1").unwrap();

    let sneaky = open_log(0, "E1", "T2", LogStatus::Paused);
    let err = queries::insert_time_log(ledger.conn(), &sneaky).unwrap_err();
    assert!(matches!(err, rusqlite::Error::SqliteFailure(..)));
}

#[test]
fn concurrent_starts_from_two_terminals_yield_one_log() {
    let db_path = setup_test_db("concurrent_start");
    {
        let ledger = Ledger::new(DbPool::new(&db_path, 5000).unwrap(), Arc::new(SystemClock));
        seed(&ledger);
    }

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = barrier.clone();
            let path = db_path.clone();
            thread::spawn(move || {
                let mut ledger =
                    Ledger::new(DbPool::new(&path, 5000).unwrap(), Arc::new(SystemClock));
                barrier.wait();
                ledger.start("T1", "E1")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict { .. })))
        .count();
    assert_eq!(ok, 1, "results: {results:?}");
    assert_eq!(conflicts, 1, "results: {results:?}");

    let check = DbPool::new(&db_path, 5000).unwrap();
    assert_eq!(queries::count_time_logs(&check.conn).unwrap(), 1);
}

#[test]
fn two_open_rows_for_one_worker_are_an_integrity_fault() {
    let rows = vec![
        open_log(1, "E1", "T1", LogStatus::InProgress),
        open_log(2, "E1", "T2", LogStatus::Paused),
    ];

    match resolve_active("E1", rows.clone()) {
        Err(AppError::Integrity(msg)) => {
            assert!(msg.contains("#1"));
            assert!(msg.contains("#2"));
        }
        other => panic!("expected Integrity, got {other:?}"),
    }
    assert!(matches!(check_exclusive(&rows), Err(AppError::Integrity(_))));
}

#[test]
fn resolve_ignores_other_workers_and_closed_rows() {
    let mut finished = open_log(3, "E1", "T2", LogStatus::Finished);
    finished.ended_at = Some(t0());
    let rows = vec![
        open_log(1, "E1", "T1", LogStatus::Paused),
        open_log(2, "E2", "T3", LogStatus::InProgress),
        finished,
    ];

    let active = resolve_active("E1", rows.clone()).unwrap().unwrap();
    assert_eq!(active.id, 1);
    assert!(resolve_active("E3", rows.clone()).unwrap().is_none());
    check_exclusive(&rows).unwrap();
}
