//! # Study Ledger
//!
//! Activity ledger service for a study app: records per-user per-day
//! counters (AI questions, quizzes, correct answers, practice seconds)
//! and serves the read projections over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! study-ledger serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod common;
mod config;
mod error;
mod ledger;
mod migrations;
mod models;
mod performance;
mod retry;
mod server;
mod version;

use error::Result;
use ledger::ActivityLedger;
use server::AppState;
use version::version_string;

/// Study Ledger - daily activity tracking service
#[derive(Parser)]
#[command(name = "study-ledger")]
#[command(version = env!("LEDGER_VERSION"))]
#[command(about = "Daily activity ledger service for a study app", long_about = None)]
struct Cli {
    /// Show detailed version information
    #[arg(long = "version-full")]
    version_full: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (the default when no command is given)
    Serve {
        /// Override the database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Generate example config file
    GenerateConfig,

    /// Run pending database migrations and exit
    Migrate {
        /// Override the database file path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging with INFO level by default (override with RUST_LOG)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle version-full flag
    if cli.version_full {
        print!("{}", version_string());
        return Ok(());
    }

    match cli.command {
        Some(Commands::GenerateConfig) => generate_config(),
        Some(Commands::Migrate { db_path }) => migrate(db_path),
        Some(Commands::Serve { db_path }) => serve(db_path),
        None => serve(None),
    }
}

fn generate_config() -> Result<()> {
    let config_path = config::Config::default_config_path()?;
    println!("Generating example config file at: {:?}", config_path);

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, config::Config::example_toml())?;
    println!("Config file generated successfully!");
    println!("Edit {} to customize settings", config_path.display());
    Ok(())
}

fn resolve_db_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| {
        common::get_data_dir().join(&config::get_config().database.path)
    })
}

fn migrate(db_path: Option<PathBuf>) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    println!("Running migrations on {}", db_path.display());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    migrations::run_migrations_on_db(&db_path)?;
    println!("Migrations complete");
    Ok(())
}

fn serve(db_path: Option<PathBuf>) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    let app_config = config::get_config();

    log::info!("Opening ledger database at {}", db_path.display());
    let ledger = ActivityLedger::new(&db_path)?;
    let state = Arc::new(AppState { ledger });

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        tokio::select! {
            result = server::start_server(state, &app_config.server) => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                Ok(())
            }
        }
    })
}
