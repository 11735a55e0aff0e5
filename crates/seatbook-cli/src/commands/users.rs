//! User listing command.

use std::collections::HashMap;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use seatbook_core::error::AppError;
use seatbook_core::types::RequesterId;
use seatbook_database::repositories::{BookingRepository, UserRepository};

use crate::output::{self, OutputFormat};

/// Arguments for the users command
#[derive(Debug, Args)]
pub struct UsersArgs {
    /// Only list users without a seat
    #[arg(long)]
    pub unseated: bool,
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    user_id: i32,
    /// Name
    name: String,
    /// Seat
    seat: String,
}

/// Execute the users command
pub async fn execute(
    args: &UsersArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;

    let users = UserRepository::new(pool.clone()).find_all().await?;
    let bookings = BookingRepository::new(pool.clone()).find_all().await?;
    let seats: HashMap<RequesterId, String> = bookings
        .iter()
        .filter_map(|b| b.user_id.map(|u| (u, b.seat_number.to_string())))
        .collect();

    let rows: Vec<UserRow> = users
        .iter()
        .map(|u| UserRow {
            user_id: u.user_id.get(),
            name: u.name.clone(),
            seat: seats.get(&u.user_id).cloned().unwrap_or_default(),
        })
        .filter(|row| !args.unseated || row.seat.is_empty())
        .collect();

    output::print_list(&rows, format);
    pool.close().await;
    Ok(())
}
