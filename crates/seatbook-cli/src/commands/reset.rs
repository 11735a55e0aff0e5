//! Seat reset command.

use clap::Args;

use seatbook_core::error::AppError;
use seatbook_database::repositories::BookingRepository;

use crate::output;

/// Arguments for the reset command
#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Skip confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Execute the reset command
pub async fn execute(args: &ResetArgs, config_path: &str) -> Result<(), AppError> {
    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("This will release every claimed seat. Continue?")
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let released = BookingRepository::new(pool.clone())
        .reset_all_owners()
        .await?;

    output::print_success(&format!("Released {released} seat(s)."));
    pool.close().await;
    Ok(())
}
