//! Plain-text rendering of ledger projections and cost reports.

use crate::core::cost::{LaborAnalytics, Profitability, RateSource, WorkOrderCost};
use crate::db::queries::RateRow;
use crate::errors::{AppError, AppResult};
use crate::models::task::Task;
use crate::models::views::{BoardView, WorkerView};
use crate::models::worker::Worker;
use crate::utils::colors::{RESET, YELLOW, color_for_margin, color_for_status};
use crate::utils::table::Table;
use crate::utils::time::{format_hours, format_seconds};
use serde::Serialize;

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

/// Pretty JSON for `--json` output.
pub fn json<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Other(format!("JSON encoding failed: {e}")))
}

pub fn tasks_table(tasks: &[Task]) -> String {
    let mut table = Table::new(&["TASK", "ORDER", "TYPE", "EST", "STATUS"]);
    for t in tasks {
        table.add_row(vec![
            t.id.clone(),
            t.work_order_id.clone(),
            t.task_type.clone(),
            format_hours(t.estimated_hours),
            t.status.as_str().to_string(),
        ]);
    }
    table.render()
}

pub fn workers_table(workers: &[Worker]) -> String {
    let mut table = Table::new(&["WORKER", "NAME", "ROLE", "PRODUCTIVITY"]);
    for w in workers {
        table.add_row(vec![
            w.id.clone(),
            w.name.clone(),
            w.role.clone(),
            w.productivity_label(),
        ]);
    }
    table.render()
}

pub fn rates_table(rates: &[RateRow]) -> String {
    let mut table = Table::new(&["WORKSHOP", "PERIOD", "RATE", "RECORDED"]);
    for r in rates {
        table.add_row(vec![
            r.workshop_id.clone(),
            r.period.clone(),
            money(r.rate),
            r.created_at.clone(),
        ]);
    }
    table.render()
}

pub fn worker_view(view: &WorkerView) -> String {
    let mut out = format!("Worker {}\n", view.worker_id);

    match &view.active {
        Some(a) => {
            let task_type = a.task.as_ref().map(|t| t.task_type.as_str()).unwrap_or("?");
            out.push_str(&format!(
                "Active: log #{} on {} ({}) {}{}{} {}\n",
                a.log.id,
                a.log.task_id,
                task_type,
                color_for_status(a.log.status),
                a.log.status,
                RESET,
                format_seconds(a.live_seconds),
            ));
            if a.stale {
                out.push_str(&format!(
                    "{}Running since {} without a pause: check it is still being worked.{}\n",
                    YELLOW,
                    a.log.started_at.format("%Y-%m-%d %H:%M:%S"),
                    RESET
                ));
            }
        }
        None => out.push_str("Active: none\n"),
    }

    if view.pending.is_empty() {
        out.push_str("Pending: none\n");
    } else {
        out.push_str("Pending:\n");
        out.push_str(&tasks_table(&view.pending));
    }
    out
}

pub fn board(view: &BoardView) -> String {
    if view.entries.is_empty() {
        return "Nobody is working right now.\n".to_string();
    }

    let mut table = Table::new(&["WORKER", "NAME", "TASK", "ORDER", "LOG", "STATUS", "ELAPSED", ""]);
    for e in &view.entries {
        table.add_row(vec![
            e.worker.id.clone(),
            e.worker.name.clone(),
            e.task.id.clone(),
            e.task.work_order_id.clone(),
            format!("#{}", e.log.id),
            e.log.status.to_string(),
            format_seconds(e.live_seconds),
            if e.stale { "STALE".into() } else { String::new() },
        ]);
    }
    table.render()
}

pub fn cost_report(cost: &WorkOrderCost) -> String {
    let mut table = Table::new(&["LOG", "TASK", "WORKER", "STATUS", "TIME", "PERIOD", "RATE", "COST"]);
    for l in &cost.lines {
        table.add_row(vec![
            format!("#{}", l.log_id),
            l.task_id.clone(),
            l.worker_id.clone(),
            l.status.to_string(),
            format_seconds(l.seconds),
            l.period.clone(),
            format!("{:.2}{}", l.rate, if l.rate_source == RateSource::Fallback { "*" } else { "" }),
            money(l.cost),
        ]);
    }

    let mut out = format!(
        "Work order {} (workshop {}) as of {}\n",
        cost.work_order_id,
        cost.workshop_id,
        cost.as_of.format("%Y-%m-%d %H:%M:%S")
    );
    if table.is_empty() {
        out.push_str("No time logged.\n");
    } else {
        out.push_str(&table.render());
    }
    out.push_str(&format!(
        "Labor: {} over {} (estimated {})\n",
        money(cost.labor_cost),
        format_seconds(cost.total_seconds),
        format_hours(cost.estimated_hours)
    ));
    if cost.open_logs > 0 {
        out.push_str(&format!(
            "{} open log(s) included up to now.\n",
            cost.open_logs
        ));
    }
    if cost.used_fallback {
        out.push_str("* default hourly rate used: hour-cost calculation missing.\n");
    }
    out
}

pub fn profitability(p: &Profitability) -> String {
    let pct = p
        .margin_pct
        .map(|v| format!(" ({:.2}%)", v))
        .unwrap_or_default();
    format!(
        "Income {} - (labor {} + parts {}) = margin {}{}{}{}\n",
        money(p.income),
        money(p.labor_cost),
        money(p.parts_cost),
        color_for_margin(p.margin),
        money(p.margin),
        RESET,
        pct
    )
}

pub fn billing_total(billed: f64, total: f64) -> String {
    format!("Billed {} + accrued labor = {}\n", money(billed), money(total))
}

pub fn analytics(a: &LaborAnalytics) -> String {
    format!(
        "Real labor {} vs valued {} → difference {} | hours {:.2} actual / {:.2} estimated\n",
        money(a.real_labor_cost),
        money(a.valued_amount),
        money(a.difference),
        a.actual_hours,
        a.estimated_hours
    )
}
