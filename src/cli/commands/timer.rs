use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::command::{self, TimerCommand};
use crate::core::ledger::Ledger;
use crate::errors::AppResult;
use crate::models::time_log::TimeLog;
use crate::ui::{messages, render};
use crate::utils::format_seconds;

fn describe(cmd: &TimerCommand, log: &TimeLog) -> String {
    match cmd {
        TimerCommand::Start { .. } => format!("Started task {} (log #{})", log.task_id, log.id),
        TimerCommand::Pause { .. } => format!(
            "Paused log #{} at {}",
            log.id,
            format_seconds(log.duration_seconds)
        ),
        TimerCommand::Resume { .. } => format!("Resumed task {} (log #{})", log.task_id, log.id),
        TimerCommand::Finish { .. } => format!(
            "Finished log #{} on task {}: {}",
            log.id,
            log.task_id,
            format_seconds(log.duration_seconds)
        ),
    }
}

/// Handle `start`, `pause`, `resume` and `finish`.
///
/// The worker's view is always printed from a fresh read, so a rejected
/// command still shows what the ledger actually holds.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let (command, json) = match cmd {
        Commands::Start { task, worker, json } => (
            TimerCommand::Start {
                task_id: task.clone(),
                worker_id: worker.clone(),
            },
            *json,
        ),
        Commands::Pause { log, worker, json } => (
            TimerCommand::Pause {
                log_id: *log,
                worker_id: worker.clone(),
            },
            *json,
        ),
        Commands::Resume { task, worker, json } => (
            TimerCommand::Resume {
                task_id: task.clone(),
                worker_id: worker.clone(),
            },
            *json,
        ),
        Commands::Finish {
            log,
            task,
            worker,
            json,
        } => (
            TimerCommand::Finish {
                log_id: *log,
                task_id: task.clone(),
                worker_id: worker.clone(),
            },
            *json,
        ),
        _ => return Ok(()),
    };

    let mut ledger = Ledger::open(cfg)?;
    let outcome = command::execute(&mut ledger, command);

    if let Ok(log) = &outcome.result {
        messages::success(describe(&outcome.command, log));
    }

    match &outcome.view {
        Ok(view) if json => println!("{}", render::json(view)?),
        Ok(view) => print!("{}", render::worker_view(view)),
        Err(e) => messages::warning(format!("Could not refresh the worker view: {}", e)),
    }

    if outcome.needs_repoll() {
        messages::info("The list was out of date and has been refreshed.");
    }

    outcome.into_result().map(|_| ())
}
