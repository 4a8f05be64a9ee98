use chrono::Duration as ChronoDuration;
use shoplog::core::command::TimerCommand;
use shoplog::core::ledger::Ledger;
use shoplog::core::poller::{
    self, BoardProjection, Poller, Projection, WorkerProjection, WorkerSession,
};
use shoplog::errors::{AppError, AppResult};
use shoplog::models::time_log::LogStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;

mod common;
use common::{manual_ledger, seed};

const TICK: Duration = Duration::from_millis(20);

fn start(task: &str, worker: &str) -> TimerCommand {
    TimerCommand::Start {
        task_id: task.into(),
        worker_id: worker.into(),
    }
}

#[tokio::test]
async fn refresh_publishes_the_worker_view() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let session = WorkerSession::new(poller::shared(ledger), "E1", TICK, 2);

    assert!(session.poller().latest().is_none());
    let view = session.poller().refresh().await.unwrap();
    assert_eq!(view.pending.len(), 2);
    assert_eq!(session.poller().latest().unwrap().worker_id, "E1");
}

#[tokio::test]
async fn dispatch_refetches_and_publishes() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let session = WorkerSession::new(poller::shared(ledger), "E1", TICK, 2);
    let rx = session.subscribe();

    let outcome = session.dispatch(start("T1", "E1")).await;
    assert!(outcome.success());
    assert!(outcome.message().is_none());

    let published = rx.borrow().clone().expect("view published");
    let active = published.active.expect("active log");
    assert_eq!(active.log.task_id, "T1");
    assert_eq!(active.log.status, LogStatus::InProgress);
}

#[tokio::test]
async fn rejected_command_still_refreshes_the_view() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let session = WorkerSession::new(poller::shared(ledger), "E1", TICK, 2);

    let first = session.dispatch(start("T1", "E1")).await.into_result().unwrap();
    let outcome = session.dispatch(start("T2", "E1")).await;

    assert!(!outcome.success());
    assert!(matches!(outcome.result, Err(AppError::Conflict { .. })));
    assert!(outcome.message().unwrap().contains("T1"));
    assert!(!outcome.needs_repoll());

    // The refreshed view shows the ledger's truth: still on T1.
    let view = outcome.view.as_ref().unwrap();
    assert_eq!(view.active.as_ref().unwrap().log.id, first.id);
    assert_eq!(
        session.poller().latest().unwrap().active.unwrap().log.id,
        first.id
    );
}

#[tokio::test]
async fn stale_pause_asks_for_a_repoll() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let session = WorkerSession::new(poller::shared(ledger), "E1", TICK, 2);

    let log = session.dispatch(start("T1", "E1")).await.into_result().unwrap();
    let pause = TimerCommand::Pause {
        log_id: log.id,
        worker_id: "E1".into(),
    };
    assert!(session.dispatch(pause.clone()).await.success());

    let again = session.dispatch(pause).await;
    assert!(matches!(again.result, Err(AppError::InvalidState { .. })));
    assert!(again.needs_repoll());
}

#[tokio::test]
async fn logs_of_another_worker_cannot_be_touched() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let shared = poller::shared(ledger);
    let anna = WorkerSession::new(shared.clone(), "E1", TICK, 2);
    let marco = WorkerSession::new(shared, "E2", TICK, 2);

    let log = anna.dispatch(start("T1", "E1")).await.into_result().unwrap();
    let outcome = marco
        .dispatch(TimerCommand::Finish {
            log_id: log.id,
            task_id: "T1".into(),
            worker_id: "E2".into(),
        })
        .await;
    assert!(matches!(outcome.result, Err(AppError::NotFound(_))));
    assert_eq!(
        anna.poller().refresh().await.unwrap().active.unwrap().log.status,
        LogStatus::InProgress
    );
}

#[tokio::test]
async fn board_is_recomputed_from_the_ledger() {
    let (ledger, clock) = manual_ledger();
    seed(&ledger);
    let shared = poller::shared(ledger);
    let board = Poller::new(shared.clone(), BoardProjection, TICK, 2);
    let session = WorkerSession::new(shared, "E2", TICK, 2);

    assert!(board.refresh().await.unwrap().entries.is_empty());

    session.dispatch(start("T3", "E2")).await.into_result().unwrap();
    clock.advance(ChronoDuration::seconds(42));

    let view = board.refresh().await.unwrap();
    let entry = view.claimed_by("T3").expect("T3 claimed");
    assert_eq!(entry.worker.id, "E2");
    assert_eq!(entry.live_seconds, 42);
    assert_eq!(view.stale_count(), 0);
}

#[tokio::test]
async fn unknown_worker_publishes_nothing() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let poller = Poller::new(
        poller::shared(ledger),
        WorkerProjection {
            worker_id: "NOBODY".into(),
        },
        TICK,
        2,
    );

    assert!(matches!(poller.refresh().await, Err(AppError::NotFound(_))));
    assert!(poller.latest().is_none());
}

fn busy() -> AppError {
    AppError::Db(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        None,
    ))
}

/// Counts reads. Reads numbered in `failing` return the error built by
/// `fail`; every other read returns its own number.
struct Scripted {
    reads: AtomicU32,
    failing: std::ops::Range<u32>,
    fail: fn() -> AppError,
}

impl Scripted {
    fn new(failing: std::ops::Range<u32>, fail: fn() -> AppError) -> Self {
        Self {
            reads: AtomicU32::new(0),
            failing,
            fail,
        }
    }
}

impl Projection for Scripted {
    type View = u32;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fetch(&self, _ledger: &Ledger) -> AppResult<u32> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&n) {
            Err((self.fail)())
        } else {
            Ok(n)
        }
    }
}

fn scripted_poller(failing: std::ops::Range<u32>, fail: fn() -> AppError, retries: u32) -> Poller<Scripted> {
    let (ledger, _clock) = manual_ledger();
    Poller::new(poller::shared(ledger), Scripted::new(failing, fail), TICK, retries)
}

#[tokio::test]
async fn failed_read_keeps_the_previous_snapshot() {
    let poller = scripted_poller(1..u32::MAX, || AppError::Other("disk unplugged".into()), 2);

    assert_eq!(poller.refresh().await.unwrap(), 0);
    assert_eq!(poller.latest(), Some(0));

    // Not a transient error, so no retry; the last good view stays.
    assert!(matches!(poller.refresh().await, Err(AppError::Other(_))));
    assert_eq!(poller.latest(), Some(0));
    assert!(matches!(poller.refresh().await, Err(AppError::Other(_))));
    assert_eq!(poller.latest(), Some(0));
}

#[tokio::test]
async fn busy_reads_are_retried() {
    // Two busy reads, then a good one: within a budget of two retries.
    let poller = scripted_poller(0..2, busy, 2);

    assert_eq!(poller.refresh().await.unwrap(), 2);
    assert_eq!(poller.latest(), Some(2));
}

#[tokio::test]
async fn busy_reads_beyond_the_retry_budget_fail() {
    let poller = scripted_poller(0..3, busy, 2);

    let err = poller.refresh().await.unwrap_err();
    assert!(err.is_retryable_read());
    assert!(poller.latest().is_none());

    // The next poll picks up where the store recovered.
    assert_eq!(poller.refresh().await.unwrap(), 3);
}

#[tokio::test]
async fn session_refuses_commands_for_another_worker() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let shared = poller::shared(ledger);
    let anna = WorkerSession::new(shared.clone(), "E1", TICK, 2);
    let marco = WorkerSession::new(shared, "E2", TICK, 2);

    let log = anna.dispatch(start("T1", "E1")).await.into_result().unwrap();

    let finish = marco
        .dispatch(TimerCommand::Finish {
            log_id: log.id,
            task_id: "T1".into(),
            worker_id: "E1".into(),
        })
        .await;
    assert!(matches!(finish.result, Err(AppError::NotFound(_))));
    assert!(finish.needs_repoll());
    // The refreshed view is the session's own.
    assert_eq!(finish.view.as_ref().unwrap().worker_id, "E2");
    assert_eq!(marco.poller().latest().unwrap().worker_id, "E2");

    let pause = marco
        .dispatch(TimerCommand::Pause {
            log_id: log.id,
            worker_id: "E1".into(),
        })
        .await;
    assert!(!pause.success());

    // Anna's log was not touched.
    let active = anna.poller().refresh().await.unwrap().active.unwrap();
    assert_eq!(active.log.id, log.id);
    assert_eq!(active.log.status, LogStatus::InProgress);
}

#[tokio::test]
async fn session_cannot_start_work_for_another_worker() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let shared = poller::shared(ledger);
    let marco = WorkerSession::new(shared.clone(), "E2", TICK, 2);
    let anna = WorkerSession::new(shared, "E1", TICK, 2);

    let outcome = marco.dispatch(start("T2", "E1")).await;
    assert!(matches!(outcome.result, Err(AppError::NotFound(_))));
    assert!(anna.poller().refresh().await.unwrap().active.is_none());
}

#[tokio::test]
async fn spawned_poller_stops_on_shutdown() {
    let (ledger, _clock) = manual_ledger();
    seed(&ledger);
    let poller = Arc::new(Poller::new(
        poller::shared(ledger),
        WorkerProjection {
            worker_id: "E1".into(),
        },
        TICK,
        2,
    ));
    let mut rx = poller.subscribe();
    let (stop_tx, stop_rx) = watch::channel(false);

    let handle = poller.clone().spawn(stop_rx);

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("first tick in time")
        .unwrap();
    assert!(rx.borrow().is_some());

    stop_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poller stopped in time")
        .unwrap();
}
