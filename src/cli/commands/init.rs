use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::log::audit;
use crate::db::migrate::applied_versions;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages;
use chrono::Utc;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file (skipped in test mode)
///  - the SQLite database with all pending migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;

    println!("⚙️  Initializing shoplog…");
    if !cli.test {
        println!("📄 Config file : {}", Config::config_file().display());
    }
    println!("🗄️  Database   : {}", cfg.database);

    // Opening the pool creates the schema.
    let pool = DbPool::new(&cfg.database, cfg.busy_timeout_ms)?;
    let versions = applied_versions(&pool.conn)?;

    if let Err(e) = audit(
        &pool.conn,
        Utc::now(),
        "init",
        "",
        &format!("Database initialized at {}", cfg.database),
    ) {
        messages::warning(format!("Failed to write internal log: {}", e));
    }

    messages::success(format!(
        "Database initialized at {} ({} migrations applied)",
        cfg.database,
        versions.len()
    ));
    Ok(())
}
