//! Database creation and migration command.

use clap::Args;

use seatbook_core::error::AppError;
use seatbook_database::connection::DatabasePool;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Do not create the database when it is missing
    #[arg(long)]
    pub no_create: bool,
}

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;

    if config.database.create_if_missing
        && !args.no_create
        && DatabasePool::ensure_database(&config.database).await?
    {
        output::print_success("Database created.");
    }

    let pool = super::create_db_pool(&config).await?;
    println!("Running database migrations...");
    seatbook_database::migration::run_migrations(&pool).await?;
    output::print_success("All migrations applied successfully.");

    pool.close().await;
    Ok(())
}
