//! shoplog main entrypoint.

use shoplog::run;
use shoplog::ui::messages;

fn main() {
    if let Err(e) = run() {
        if e.is_rejection() {
            messages::blocked(&e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
