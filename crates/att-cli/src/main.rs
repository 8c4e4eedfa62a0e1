use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use att_cli::commands::{
    import_schedules, ingest, rebuild, recompute_stats, report, status, top_late,
};
use att_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(att_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = att_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Ingest { file }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            ingest::run(&mut db, &config, file)?;
        }
        Some(Commands::ImportSchedules { file }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            import_schedules::run(&mut db, file)?;
        }
        Some(Commands::Rebuild { from, to, reset }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            rebuild::run(&mut db, &config, *from, *to, *reset)?;
        }
        Some(Commands::RecomputeStats) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            recompute_stats::run(&mut db)?;
        }
        Some(Commands::Report { from, to, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            report::run(&mut std::io::stdout(), &db, &config, *from, *to, *json)?;
        }
        Some(Commands::TopLate { limit }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            top_late::run(&mut std::io::stdout(), &db, *limit)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
