use crate::cli::parser::{Commands, OrderAction, RateAction, TaskAction, WorkerAction};
use crate::config::Config;
use crate::core::registry::RegistryLogic;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::AppResult;
use crate::models::worker::Worker;
use crate::ui::{messages, render};
use chrono::Utc;

/// Handle `worker`, `order`, `task` and `rate`.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let mut pool = DbPool::new(&cfg.database, cfg.busy_timeout_ms)?;

    match cmd {
        Commands::Worker { action } => worker(&mut pool, action),
        Commands::Order { action } => order(&mut pool, cfg, action),
        Commands::Task { action } => task(&mut pool, action),
        Commands::Rate { action } => rate(&mut pool, cfg, action),
        _ => Ok(()),
    }
}

fn worker(pool: &mut DbPool, action: &WorkerAction) -> AppResult<()> {
    match action {
        WorkerAction::Add {
            id,
            name,
            role,
            non_productive,
            productivity,
        } => {
            let mut w = Worker::new(id, name)
                .with_role(role)
                .with_productivity(*productivity);
            if *non_productive {
                w = w.non_productive();
            }
            pool.write_tx(|tx| RegistryLogic::add_worker(tx, &w, Utc::now()))?;
            messages::success(format!("Worker {} saved ({})", w.id, w.productivity_label()));
        }
        WorkerAction::List => {
            let workers = queries::list_workers(&pool.conn)?;
            if workers.is_empty() {
                messages::info("No workers registered.");
            } else {
                print!("{}", render::workers_table(&workers));
            }
        }
    }
    Ok(())
}

fn order(pool: &mut DbPool, cfg: &Config, action: &OrderAction) -> AppResult<()> {
    match action {
        OrderAction::Add {
            id,
            workshop,
            description,
        } => {
            let workshop = workshop.as_deref().unwrap_or(&cfg.workshop_id);
            let order = pool.write_tx(|tx| {
                RegistryLogic::add_work_order(tx, id, workshop, description, Utc::now())
            })?;
            messages::success(format!(
                "Work order {} opened in workshop {}",
                order.id, order.workshop_id
            ));
        }
    }
    Ok(())
}

fn task(pool: &mut DbPool, action: &TaskAction) -> AppResult<()> {
    match action {
        TaskAction::Add {
            id,
            order,
            worker,
            task_type,
            hours,
        } => {
            let task = pool.write_tx(|tx| {
                RegistryLogic::add_task(tx, id, order, worker.as_deref(), task_type, *hours, Utc::now())
            })?;
            messages::success(format!(
                "Task {} added to work order {}",
                task.id, task.work_order_id
            ));
        }
        TaskAction::Reopen { id } => {
            pool.write_tx(|tx| RegistryLogic::reopen_task(tx, id, Utc::now()))?;
            messages::success(format!("Task {} reopened", id));
        }
        TaskAction::List { order } => {
            let tasks = match order {
                Some(o) => queries::tasks_for_work_order(&pool.conn, o)?,
                None => queries::list_tasks(&pool.conn)?,
            };
            if tasks.is_empty() {
                messages::info("No tasks found.");
            } else {
                print!("{}", render::tasks_table(&tasks));
            }
        }
    }
    Ok(())
}

fn rate(pool: &mut DbPool, cfg: &Config, action: &RateAction) -> AppResult<()> {
    match action {
        RateAction::Set {
            period,
            rate,
            workshop,
        } => {
            let workshop = workshop.as_deref().unwrap_or(&cfg.workshop_id);
            let period =
                pool.write_tx(|tx| RegistryLogic::set_rate(tx, workshop, period, *rate, Utc::now()))?;
            messages::success(format!(
                "Hourly rate {:.2} recorded for {} / {}",
                rate, workshop, period
            ));
        }
        RateAction::List => {
            let rates = queries::list_hourly_rates(&pool.conn)?;
            if rates.is_empty() {
                messages::info("No hour-cost calculations recorded.");
            } else {
                print!("{}", render::rates_table(&rates));
            }
        }
    }
    Ok(())
}
