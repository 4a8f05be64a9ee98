use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::Ledger;
use crate::errors::AppResult;
use crate::ui::{messages, render};

/// Handle `active`, `pending` and `board`.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let ledger = Ledger::open(cfg)?;

    match cmd {
        Commands::Active { worker, json } => {
            let view = ledger.worker_view(worker)?;
            if *json {
                println!("{}", render::json(&view)?);
            } else {
                print!("{}", render::worker_view(&view));
            }
        }
        Commands::Pending { worker, json } => {
            let pending = ledger.tasks_by_worker(worker)?;
            if *json {
                println!("{}", render::json(&pending)?);
            } else if pending.is_empty() {
                messages::info(format!("No pending tasks for {}.", worker));
            } else {
                print!("{}", render::tasks_table(&pending));
            }
        }
        Commands::Board { json } => {
            let board = ledger.board_view()?;
            if *json {
                println!("{}", render::json(&board)?);
            } else {
                messages::header("Workshop board");
                print!("{}", render::board(&board));
                let stale = board.stale_count();
                if stale > 0 {
                    messages::warning(format!(
                        "{} log(s) have been running for more than {} minutes.",
                        stale, cfg.stale_after_minutes
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(())
}
