//! Mutations as commands, each followed by a mandatory re-fetch.
//!
//! The caller never trusts its own optimistic idea of the result: after the
//! write (accepted or rejected) the issuing worker's view is read back from
//! the ledger. Commands are never retried.

use crate::core::ledger::Ledger;
use crate::errors::{AppError, AppResult};
use crate::models::time_log::TimeLog;
use crate::models::views::WorkerView;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TimerCommand {
    Start { task_id: String, worker_id: String },
    Pause { log_id: i64, worker_id: String },
    Resume { task_id: String, worker_id: String },
    Finish { log_id: i64, task_id: String, worker_id: String },
}

impl TimerCommand {
    /// The worker issuing the command; their view is refreshed afterwards.
    pub fn worker_id(&self) -> &str {
        match self {
            TimerCommand::Start { worker_id, .. }
            | TimerCommand::Pause { worker_id, .. }
            | TimerCommand::Resume { worker_id, .. }
            | TimerCommand::Finish { worker_id, .. } => worker_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimerCommand::Start { .. } => "start",
            TimerCommand::Pause { .. } => "pause",
            TimerCommand::Resume { .. } => "resume",
            TimerCommand::Finish { .. } => "finish",
        }
    }
}

#[derive(Debug)]
pub struct CommandOutcome {
    pub command: TimerCommand,
    pub result: AppResult<TimeLog>,
    /// Re-fetched after the command, success or not.
    pub view: AppResult<WorkerView>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    /// Blocking message for the worker when the command was rejected.
    pub fn message(&self) -> Option<String> {
        self.result.as_ref().err().map(|e| e.to_string())
    }

    /// Stale client state (InvalidState, TaskFinished or NotFound) asks for
    /// a list refresh.
    pub fn needs_repoll(&self) -> bool {
        matches!(
            self.result,
            Err(AppError::InvalidState { .. })
                | Err(AppError::TaskFinished(_))
                | Err(AppError::NotFound(_))
        )
    }

    pub fn into_result(self) -> AppResult<TimeLog> {
        self.result
    }
}

/// Logs are owned by the worker who opened them.
fn owned_log(ledger: &Ledger, log_id: i64, worker_id: &str) -> AppResult<()> {
    let log = ledger.get_log(log_id)?;
    if log.worker_id != worker_id {
        return Err(AppError::NotFound(format!(
            "time log #{log_id} for worker {worker_id}"
        )));
    }
    Ok(())
}

fn apply(ledger: &mut Ledger, cmd: &TimerCommand) -> AppResult<TimeLog> {
    match cmd {
        TimerCommand::Start { task_id, worker_id } => ledger.start(task_id, worker_id),
        TimerCommand::Pause { log_id, worker_id } => {
            owned_log(ledger, *log_id, worker_id)?;
            ledger.pause(*log_id)
        }
        TimerCommand::Resume { task_id, worker_id } => ledger.resume(task_id, worker_id),
        TimerCommand::Finish {
            log_id,
            task_id,
            worker_id,
        } => {
            owned_log(ledger, *log_id, worker_id)?;
            ledger.finish(*log_id, task_id)
        }
    }
}

/// Run `cmd`, then force a re-fetch of the issuing worker's view.
pub fn execute(ledger: &mut Ledger, cmd: TimerCommand) -> CommandOutcome {
    let result = apply(ledger, &cmd);

    if let Err(e) = &result {
        warn!(
            command = cmd.name(),
            worker_id = cmd.worker_id(),
            error = %e,
            "command rejected"
        );
    }

    let view = ledger.worker_view(cmd.worker_id());

    CommandOutcome {
        command: cmd,
        result,
        view,
    }
}
