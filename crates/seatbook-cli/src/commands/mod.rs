//! CLI command definitions and dispatch.

pub mod allocate;
pub mod migrate;
pub mod reset;
pub mod seats;
pub mod seed;
pub mod users;

use clap::{Parser, Subcommand};

use seatbook_core::config::AppConfig;
use seatbook_core::error::AppError;
use seatbook_database::connection::DatabasePool;

use crate::output::OutputFormat;

/// SeatBook concurrent seat allocation tools
#[derive(Debug, Parser)]
#[command(name = "seatbook-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database if needed and apply migrations
    Migrate(migrate::MigrateArgs),
    /// Insert generated users and the seat grid into empty tables
    Seed(seed::SeedArgs),
    /// Release every seat
    Reset(reset::ResetArgs),
    /// Run a concurrent allocation for all users
    Allocate(allocate::AllocateArgs),
    /// Show seats and their owners
    Seats(seats::SeatsArgs),
    /// List users
    Users(users::UsersArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Seed(args) => seed::execute(args, &self.config, self.format).await,
            Commands::Reset(args) => reset::execute(args, &self.config).await,
            Commands::Allocate(args) => allocate::execute(args, &self.config, self.format).await,
            Commands::Seats(args) => seats::execute(args, &self.config, self.format).await,
            Commands::Users(args) => users::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<sqlx::PgPool, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(pool.into_pool())
}
