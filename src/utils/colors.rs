/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

use crate::models::time_log::LogStatus;

/// Status color:
/// in_progress → green
/// paused → yellow
/// finished → grey
pub fn color_for_status(status: LogStatus) -> &'static str {
    match status {
        LogStatus::InProgress => GREEN,
        LogStatus::Paused => YELLOW,
        LogStatus::Finished => GREY,
    }
}

/// Margin color: negative margins are red.
pub fn color_for_margin(value: f64) -> &'static str {
    if value < 0.0 {
        RED
    } else if value > 0.0 {
        GREEN
    } else {
        RESET
    }
}
