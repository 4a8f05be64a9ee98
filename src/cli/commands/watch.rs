use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::Ledger;
use crate::core::poller::{self, BoardProjection, Poller, Projection, WorkerProjection};
use crate::errors::{AppError, AppResult};
use crate::ui::{messages, render};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Print every new snapshot until Ctrl-C.
async fn follow<P, F>(poller: Arc<Poller<P>>, render_view: F) -> AppResult<()>
where
    P: Projection,
    F: Fn(&P::View) -> String,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut snapshots = poller.subscribe();
    let handle = poller.clone().spawn(stop_rx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let text = snapshots.borrow_and_update().as_ref().map(&render_view);
                if let Some(text) = text {
                    print!("{CLEAR_SCREEN}{text}");
                    println!("\n(refresh every {}s, Ctrl-C to quit)", poller.interval().as_secs());
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    let _ = stop_tx.send(true);
    handle
        .await
        .map_err(|e| AppError::Other(format!("poller task failed: {e}")))
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Watch { worker } = cmd else {
        return Ok(());
    };

    let ledger = Ledger::open(cfg)?;
    if let Some(w) = worker {
        // Fail fast on an unknown worker instead of warning on every tick.
        ledger.worker_view(w)?;
    }
    let ledger = poller::shared(ledger);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match worker {
            Some(w) => {
                let poller = Arc::new(Poller::new(
                    ledger,
                    WorkerProjection {
                        worker_id: w.clone(),
                    },
                    Duration::from_secs(cfg.worker_poll_secs),
                    cfg.read_retries,
                ));
                follow(poller, render::worker_view).await
            }
            None => {
                let poller = Arc::new(Poller::new(
                    ledger,
                    BoardProjection,
                    Duration::from_secs(cfg.board_poll_secs),
                    cfg.read_retries,
                ));
                follow(poller, render::board).await
            }
        }
    })?;

    messages::info("Stopped watching.");
    Ok(())
}
