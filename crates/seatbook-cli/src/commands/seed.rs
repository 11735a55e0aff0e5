//! Test-data seeding command.

use clap::Args;

use seatbook_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the seed command
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Number of users to generate, overriding `seed.users`
    #[arg(short, long)]
    pub users: Option<u32>,
}

/// Execute the seed command
pub async fn execute(
    args: &SeedArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let mut config = super::load_config(config_path)?;
    if let Some(users) = args.users {
        config.seed.users = users;
    }
    let pool = super::create_db_pool(&config).await?;

    let summary = seatbook_database::seed::seed(&pool, &config.seed, &config.layout).await?;

    match format {
        OutputFormat::Json => output::print_json(&summary),
        OutputFormat::Table => {
            output::print_success("Seeding complete.");
            output::print_kv("Users created", &summary.users_created.to_string());
            output::print_kv("Trips created", &summary.trips_created.to_string());
            output::print_kv("Seats created", &summary.seats_created.to_string());
        }
    }

    pool.close().await;
    Ok(())
}
