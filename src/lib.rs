//! shoplog library root.
//! Exposes the CLI parser, the high-level run() function, and the
//! time-tracking engine modules.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::{AppError, AppResult};

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Worker { .. }
        | Commands::Order { .. }
        | Commands::Task { .. }
        | Commands::Rate { .. } => cli::commands::registry::handle(&cli.command, cfg),
        Commands::Start { .. }
        | Commands::Pause { .. }
        | Commands::Resume { .. }
        | Commands::Finish { .. } => cli::commands::timer::handle(&cli.command, cfg),
        Commands::Active { .. } | Commands::Pending { .. } | Commands::Board { .. } => {
            cli::commands::status::handle(&cli.command, cfg)
        }
        Commands::Cost { .. } => cli::commands::cost::handle(&cli.command, cfg),
        Commands::Watch { .. } => cli::commands::watch::handle(&cli.command, cfg),
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the configured level.
pub fn init_tracing(level: &str) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Other(format!("failed to initialize tracing subscriber: {e}")))
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }

    init_tracing(&cfg.log_level)?;

    dispatch(&cli, &cfg)
}
