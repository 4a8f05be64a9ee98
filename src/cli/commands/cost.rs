use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ledger::Ledger;
use crate::errors::{AppError, AppResult};
use crate::ui::render;
use serde_json::json;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Cost {
        order,
        income,
        parts,
        billed,
        valued,
        json,
    } = cmd
    else {
        return Ok(());
    };

    if [Some(*parts), *income, *billed, *valued]
        .into_iter()
        .flatten()
        .any(|v| !v.is_finite() || v < 0.0)
    {
        return Err(AppError::InvalidInput(
            "amounts must be non-negative numbers".into(),
        ));
    }

    let ledger = Ledger::open(cfg)?;
    let cost = ledger.work_order_cost(order, cfg.default_hourly_rate)?;

    let profitability = income.map(|i| cost.profitability(i, *parts));
    let billing_total = billed.map(|b| cost.billing_total(b));
    let analytics = valued.map(|v| cost.analytics(v));

    if *json {
        let doc = json!({
            "cost": cost,
            "profitability": profitability,
            "billing_total": billing_total,
            "analytics": analytics,
        });
        println!("{}", render::json(&doc)?);
        return Ok(());
    }

    print!("{}", render::cost_report(&cost));
    if let Some(p) = &profitability {
        print!("{}", render::profitability(p));
    }
    if let (Some(b), Some(total)) = (billed, billing_total) {
        print!("{}", render::billing_total(*b, total));
    }
    if let Some(a) = &analytics {
        print!("{}", render::analytics(a));
    }

    Ok(())
}
