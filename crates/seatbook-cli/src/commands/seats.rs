//! Seat listing command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use seatbook_core::error::AppError;
use seatbook_database::repositories::BookingRepository;
use seatbook_entity::booking::SeatMap;

use crate::output::{self, OutputFormat};

/// Arguments for the seats command
#[derive(Debug, Args)]
pub struct SeatsArgs {
    /// Render the seat grid instead of a table
    #[arg(long)]
    pub map: bool,

    /// Only list seats without an owner
    #[arg(long)]
    pub available: bool,
}

/// Seat display row for table output
#[derive(Debug, Serialize, Tabled)]
struct SeatRow {
    /// Booking ID
    booking_id: i32,
    /// Airline
    airline: String,
    /// Seat
    seat: String,
    /// Owner
    owner: String,
}

/// Execute the seats command
pub async fn execute(
    args: &SeatsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let repo = BookingRepository::new(pool.clone());

    let bookings = repo.find_all().await?;

    if args.map {
        let map = SeatMap::from_bookings(&bookings, &config.layout);
        match format {
            OutputFormat::Json => output::print_json(&map),
            OutputFormat::Table => {
                print!("{map}");
                output::print_kv("Occupied", &map.occupied().to_string());
                output::print_kv("Free", &map.free().to_string());
            }
        }
    } else {
        let rows: Vec<SeatRow> = bookings
            .iter()
            .filter(|b| !args.available || b.is_available())
            .map(|b| SeatRow {
                booking_id: b.booking_id.get(),
                airline: b.airline_name.clone(),
                seat: b.seat_number.to_string(),
                owner: b.user_id.map(|u| u.to_string()).unwrap_or_default(),
            })
            .collect();
        output::print_list(&rows, format);

        if format == OutputFormat::Table {
            let available = repo.count_available().await?;
            output::print_kv("Available", &format!("{available}/{}", bookings.len()));
        }
    }

    pool.close().await;
    Ok(())
}
