//! Cost Accrual Aggregator: elapsed time → money, per work order.
//!
//! `cost = seconds / 3600 × rate`, where the rate is the snapshot frozen
//! for the log's (period, workshop) the first time it was resolved.

use crate::db::log::audit;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::time_log::{LogStatus, TimeLog};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Source of the active hour-cost calculation: (period, workshop) → rate.
/// `Ok(None)` means no calculation exists yet.
pub trait HourlyRateResolver {
    fn resolve(&self, period: &str, workshop_id: &str) -> AppResult<Option<f64>>;
}

/// Reads the most recent row of the `hourly_rates` table.
pub struct SqliteRates<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRates<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HourlyRateResolver for SqliteRates<'_> {
    fn resolve(&self, period: &str, workshop_id: &str) -> AppResult<Option<f64>> {
        queries::latest_hourly_rate(self.conn, workshop_id, period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Frozen earlier for this (period, workshop).
    Snapshot,
    /// Resolved just now and frozen.
    Resolved,
    /// Unresolved; configured default used and not frozen.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateResolution {
    pub rate: f64,
    pub source: RateSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogCost {
    pub log_id: i64,
    pub task_id: String,
    pub worker_id: String,
    pub status: LogStatus,
    pub seconds: i64,
    pub period: String,
    pub rate: f64,
    pub rate_source: RateSource,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkOrderCost {
    pub work_order_id: String,
    pub workshop_id: String,
    pub total_seconds: i64,
    pub labor_cost: f64,
    pub open_logs: usize,
    pub used_fallback: bool,
    pub estimated_hours: f64,
    pub lines: Vec<LogCost>,
    pub as_of: DateTime<Utc>,
}

/// Pre-close profitability: margin = income − (labor + parts).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Profitability {
    pub income: f64,
    pub labor_cost: f64,
    pub parts_cost: f64,
    pub margin: f64,
    pub margin_pct: Option<f64>,
}

/// Real labor cost against what was valued/billed for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LaborAnalytics {
    pub real_labor_cost: f64,
    pub valued_amount: f64,
    pub difference: f64,
    pub actual_hours: f64,
    pub estimated_hours: f64,
}

/// Rounded to cents. Never returns negative zero.
pub fn round_currency(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 { 0.0 } else { r }
}

fn sum(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

/// Money for `seconds` of labor at `rate` per hour, rounded to cents.
pub fn labor_cost(seconds: i64, rate: f64) -> f64 {
    round_currency(seconds as f64 / 3600.0 * rate)
}

impl WorkOrderCost {
    pub fn hours(&self) -> f64 {
        self.total_seconds as f64 / 3600.0
    }

    pub fn profitability(&self, income: f64, parts_cost: f64) -> Profitability {
        let margin = round_currency(income - (self.labor_cost + parts_cost));
        let margin_pct = if income != 0.0 {
            Some(round_currency(margin / income * 100.0))
        } else {
            None
        };
        Profitability {
            income,
            labor_cost: self.labor_cost,
            parts_cost,
            margin,
            margin_pct,
        }
    }

    /// Total shown in the billing history: billed amount plus accrued labor.
    pub fn billing_total(&self, billed: f64) -> f64 {
        round_currency(billed + self.labor_cost)
    }

    pub fn analytics(&self, valued_amount: f64) -> LaborAnalytics {
        LaborAnalytics {
            real_labor_cost: self.labor_cost,
            valued_amount,
            difference: round_currency(valued_amount - self.labor_cost),
            actual_hours: self.hours(),
            estimated_hours: self.estimated_hours,
        }
    }
}

pub struct CostAggregator<'a, R: HourlyRateResolver> {
    conn: &'a Connection,
    rates: R,
    default_rate: f64,
    resolved: HashMap<(String, String), RateResolution>,
}

impl<'a, R: HourlyRateResolver> CostAggregator<'a, R> {
    pub fn new(conn: &'a Connection, rates: R, default_rate: f64) -> Self {
        Self {
            conn,
            rates,
            default_rate,
            resolved: HashMap::new(),
        }
    }

    /// Rate for (period, workshop): frozen snapshot first, then the resolver,
    /// then the configured default. Never fails because a rate is missing.
    pub fn rate_for(
        &mut self,
        period: &str,
        workshop_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RateResolution> {
        let key = (workshop_id.to_string(), period.to_string());
        if let Some(r) = self.resolved.get(&key) {
            return Ok(*r);
        }

        let resolution = if let Some(rate) = queries::get_rate_snapshot(self.conn, workshop_id, period)? {
            RateResolution {
                rate,
                source: RateSource::Snapshot,
            }
        } else {
            match self.rates.resolve(period, workshop_id) {
                Ok(Some(rate)) if rate.is_finite() && rate >= 0.0 => {
                    let frozen = queries::freeze_rate_snapshot(
                        self.conn,
                        workshop_id,
                        period,
                        rate,
                        now,
                    )?;
                    debug!(workshop_id, period, rate = frozen, "hourly rate snapshot frozen");
                    RateResolution {
                        rate: frozen,
                        source: RateSource::Resolved,
                    }
                }
                other => {
                    let reason = match other {
                        Ok(Some(bad)) => format!("unusable rate {bad}"),
                        Ok(None) => "no hour-cost calculation".to_string(),
                        Err(e) => e.to_string(),
                    };
                    self.note_fallback(period, workshop_id, &reason, now);
                    RateResolution {
                        rate: self.default_rate,
                        source: RateSource::Fallback,
                    }
                }
            }
        };

        self.resolved.insert(key, resolution);
        Ok(resolution)
    }

    fn note_fallback(&self, period: &str, workshop_id: &str, reason: &str, now: DateTime<Utc>) {
        warn!(
            workshop_id,
            period,
            default_rate = self.default_rate,
            reason,
            "hourly rate unresolved, using default"
        );
        if let Err(e) = audit(
            self.conn,
            now,
            "rate_fallback",
            &format!("{workshop_id}/{period}"),
            &format!("default {} used: {}", self.default_rate, reason),
        ) {
            warn!(error = %e, "failed to record rate fallback");
        }
    }

    /// Cost of one log as of `now`, including its running interval.
    pub fn log_cost(&mut self, log: &TimeLog, workshop_id: &str, now: DateTime<Utc>) -> AppResult<LogCost> {
        let period = log.period();
        let rate = self.rate_for(&period, workshop_id, now)?;
        let seconds = log.live_duration(now);

        Ok(LogCost {
            log_id: log.id,
            task_id: log.task_id.clone(),
            worker_id: log.worker_id.clone(),
            status: log.status,
            seconds,
            period,
            rate: rate.rate,
            rate_source: rate.source,
            cost: labor_cost(seconds, rate.rate),
        })
    }

    /// Sum over every log of the work order's tasks, as of `now`.
    pub fn work_order_cost(&mut self, work_order_id: &str, now: DateTime<Utc>) -> AppResult<WorkOrderCost> {
        let order = queries::get_work_order(self.conn, work_order_id)?
            .ok_or_else(|| AppError::NotFound(format!("work order {work_order_id}")))?;

        let logs = queries::logs_for_work_order(self.conn, work_order_id)?;
        let estimated_hours = sum(
            queries::tasks_for_work_order(self.conn, work_order_id)?
                .iter()
                .map(|t| t.estimated_hours),
        );

        let mut lines = Vec::with_capacity(logs.len());
        for log in &logs {
            lines.push(self.log_cost(log, &order.workshop_id, now)?);
        }

        Ok(WorkOrderCost {
            work_order_id: order.id,
            workshop_id: order.workshop_id,
            total_seconds: lines.iter().map(|l| l.seconds).sum(),
            labor_cost: round_currency(sum(lines.iter().map(|l| l.cost))),
            open_logs: logs.iter().filter(|l| l.is_open()).count(),
            used_fallback: lines.iter().any(|l| l.rate_source == RateSource::Fallback),
            estimated_hours,
            lines,
            as_of: now,
        })
    }
}
