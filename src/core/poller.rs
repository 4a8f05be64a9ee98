//! Presence / synchronization loops.
//!
//! Each loop recomputes a projection from the ledger on a timer and publishes
//! it on a `watch` channel. Subscribers always see the latest snapshot; a
//! failed read keeps the previous one. Nothing here writes to the ledger
//! except `WorkerSession::dispatch`, which goes through the command pipeline.

use crate::core::command::{self, CommandOutcome, TimerCommand};
use crate::core::ledger::Ledger;
use crate::errors::{AppError, AppResult};
use crate::models::views::{BoardView, WorkerView};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub type SharedLedger = Arc<Mutex<Ledger>>;

pub fn shared(ledger: Ledger) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}

/// A read-only view recomputed from the ledger on every poll.
pub trait Projection: Send + Sync + 'static {
    type View: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;
    fn fetch(&self, ledger: &Ledger) -> AppResult<Self::View>;
}

/// One worker's panel: active log + pending tasks.
pub struct WorkerProjection {
    pub worker_id: String,
}

impl Projection for WorkerProjection {
    type View = WorkerView;

    fn name(&self) -> &'static str {
        "worker"
    }

    fn fetch(&self, ledger: &Ledger) -> AppResult<WorkerView> {
        ledger.worker_view(&self.worker_id)
    }
}

/// Workshop-wide "who is working on what now".
pub struct BoardProjection;

impl Projection for BoardProjection {
    type View = BoardView;

    fn name(&self) -> &'static str {
        "board"
    }

    fn fetch(&self, ledger: &Ledger) -> AppResult<BoardView> {
        ledger.board_view()
    }
}

fn lock_poisoned() -> AppError {
    AppError::Other("ledger lock poisoned".into())
}

async fn fetch_once<P: Projection>(ledger: SharedLedger, projection: Arc<P>) -> AppResult<P::View> {
    tokio::task::spawn_blocking(move || {
        let guard = ledger.lock().map_err(|_| lock_poisoned())?;
        projection.fetch(&guard)
    })
    .await
    .map_err(|e| AppError::Other(format!("poll task failed: {e}")))?
}

pub struct Poller<P: Projection> {
    ledger: SharedLedger,
    projection: Arc<P>,
    interval: Duration,
    retries: u32,
    tx: watch::Sender<Option<P::View>>,
}

impl<P: Projection> Poller<P> {
    pub fn new(ledger: SharedLedger, projection: P, interval: Duration, retries: u32) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            ledger,
            projection: Arc::new(projection),
            interval,
            retries,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<P::View>> {
        self.tx.subscribe()
    }

    /// Last published snapshot.
    pub fn latest(&self) -> Option<P::View> {
        self.tx.borrow().clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace the published snapshot without reading the ledger.
    pub(crate) fn publish(&self, view: P::View) {
        self.tx.send_replace(Some(view));
    }

    /// Read the projection now, retrying transient storage errors, and
    /// publish it. On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> AppResult<P::View> {
        let mut attempt = 0;
        loop {
            match fetch_once(self.ledger.clone(), self.projection.clone()).await {
                Ok(view) => {
                    self.publish(view.clone());
                    return Ok(view);
                }
                Err(e) if e.is_retryable_read() && attempt < self.retries => {
                    attempt += 1;
                    debug!(poller = self.projection.name(), attempt, error = %e, "retrying read");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll on a fixed interval until `shutdown` flips to true or its
    /// sender goes away. The first tick fires immediately.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh().await {
                            warn!(
                                poller = self.projection.name(),
                                error = %e,
                                "refresh failed, keeping last snapshot"
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!(poller = self.projection.name(), "poller stopped");
        })
    }
}

/// A worker's open panel: their poll loop plus command dispatch, so a
/// command's mandatory re-fetch lands on the same channel as the polls.
pub struct WorkerSession {
    worker_id: String,
    ledger: SharedLedger,
    poller: Arc<Poller<WorkerProjection>>,
}

impl WorkerSession {
    pub fn new(ledger: SharedLedger, worker_id: &str, interval: Duration, retries: u32) -> Self {
        let projection = WorkerProjection {
            worker_id: worker_id.to_string(),
        };
        Self {
            worker_id: worker_id.to_string(),
            poller: Arc::new(Poller::new(ledger.clone(), projection, interval, retries)),
            ledger,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn poller(&self) -> Arc<Poller<WorkerProjection>> {
        self.poller.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WorkerView>> {
        self.poller.subscribe()
    }

    /// Execute a command and publish the refreshed view immediately.
    /// Commands naming another worker are rejected without touching the ledger.
    pub async fn dispatch(&self, cmd: TimerCommand) -> CommandOutcome {
        if cmd.worker_id() != self.worker_id {
            warn!(
                session = %self.worker_id,
                worker_id = cmd.worker_id(),
                command = cmd.name(),
                "command issued for another worker"
            );
            let result = Err(AppError::NotFound(format!(
                "worker {} in the session of {}",
                cmd.worker_id(),
                self.worker_id
            )));
            let view = self.poller.refresh().await;
            return CommandOutcome {
                command: cmd,
                result,
                view,
            };
        }

        let ledger = self.ledger.clone();
        let fallback = cmd.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = match ledger.lock() {
                Ok(g) => g,
                Err(_) => {
                    return CommandOutcome {
                        command: cmd,
                        result: Err(lock_poisoned()),
                        view: Err(lock_poisoned()),
                    };
                }
            };
            command::execute(&mut guard, cmd)
        })
        .await
        .unwrap_or_else(|e| CommandOutcome {
            command: fallback,
            result: Err(AppError::Other(format!("command task failed: {e}"))),
            view: Err(AppError::Other("view not refreshed".into())),
        });

        if let Ok(view) = &outcome.view {
            self.poller.publish(view.clone());
        }

        outcome
    }
}
