use crate::db::log::{AuditRow, load_audit};
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use rusqlite::Connection;
use std::sync::OnceLock;

const MAX_OP_WIDTH: usize = 48;

fn strip_ansi(s: &str) -> String {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    match ANSI.get_or_init(|| Regex::new(r"\x1B\[[0-9;]*[mK]").ok()) {
        Some(re) => re.replace_all(s, "").into_owned(),
        None => s.to_string(),
    }
}

/// Colour of the operation column
fn color_for_operation(op: &str) -> Colour {
    match op {
        "start" | "resume" => Colour::Green,
        "pause" => Colour::Yellow,
        "finish" => Colour::Blue,
        "rate_fallback" => Colour::Red,
        "migration_applied" => Colour::Purple,
        "worker" | "order" | "task" | "rate" | "reopen" => Colour::Cyan,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

/// Render one audit row; only the operation word is coloured.
pub fn render_row(row: &AuditRow, id_w: usize, date_w: usize, op_w: usize) -> String {
    let color = color_for_operation(&row.operation);

    let mut visible = if row.target.is_empty() {
        row.operation.clone()
    } else {
        format!("{} ({})", row.operation, row.target)
    };
    if visible.chars().count() > op_w {
        visible = visible.chars().take(op_w.saturating_sub(3)).collect::<String>() + "...";
    }

    let colored = match visible.split_once(' ') {
        Some((op, rest)) => format!("{} {}", color.paint(op), rest),
        None => color.paint(visible.as_str()).to_string(),
    };
    let padding = " ".repeat(op_w.saturating_sub(strip_ansi(&colored).chars().count()));

    format!(
        "{:>id_w$}: {:<date_w$} | {}{} => {}",
        row.id,
        row.date,
        colored,
        padding,
        row.message,
        id_w = id_w,
        date_w = date_w
    )
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(conn: &Connection) -> AppResult<()> {
        let entries = load_audit(conn)?;
        if entries.is_empty() {
            println!("📜 Audit log is empty.");
            return Ok(());
        }

        let id_w = entries
            .iter()
            .map(|r| r.id.to_string().len())
            .max()
            .unwrap_or(1);
        let date_w = entries.iter().map(|r| r.date.len()).max().unwrap_or(10);
        let op_w = entries
            .iter()
            .map(|r| r.operation.len() + r.target.len() + 3)
            .max()
            .unwrap_or(10)
            .min(MAX_OP_WIDTH);

        println!("📜 Audit log:\n");
        for row in &entries {
            println!("{}", render_row(row, id_w, date_w, op_w));
        }

        Ok(())
    }
}
