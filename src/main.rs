//! SeatBook concurrent seat allocation run.
//!
//! Main entry point that wires all crates together: prepares the database,
//! seeds it, releases every seat, lets every user race for one seat
//! concurrently, and prints the resulting seat map.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use seatbook_allocator::{PgSeatStore, SeatAllocator, SeatStore};
use seatbook_core::config::AppConfig;
use seatbook_core::error::AppError;
use seatbook_database::connection::DatabasePool;
use seatbook_entity::booking::SeatMap;

/// Run one concurrent seat allocation against PostgreSQL.
#[derive(Debug, Parser)]
#[command(name = "seatbook", version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Allocate even when there are fewer users than seats
    #[arg(long)]
    allow_shortfall: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_configuration(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, &args).await {
        tracing::error!(error = %e, "Allocation run failed");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration(args: &Args) -> Result<AppConfig, AppError> {
    let path = args.config.to_string_lossy();
    AppConfig::load(&path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Prepare the database, allocate, and print the result
async fn run(config: AppConfig, args: &Args) -> Result<(), AppError> {
    tracing::info!("Starting SeatBook v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database bootstrap ───────────────────────────────
    if config.database.create_if_missing {
        DatabasePool::ensure_database(&config.database).await?;
    }
    let db = DatabasePool::connect(&config.database).await?;
    db.health_check().await?;
    seatbook_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Test data ────────────────────────────────────────
    let summary = seatbook_database::seed::seed(db.pool(), &config.seed, &config.layout).await?;
    tracing::info!(
        users = summary.users_created,
        trips = summary.trips_created,
        seats = summary.seats_created,
        "Seeding finished"
    );

    // ── Step 3: Requesters and a clean seat table ────────────────
    let store = PgSeatStore::new(db.pool().clone());
    let users = store.list_requesters().await?;
    let seats = store.list_seats().await?;
    tracing::info!(users = users.len(), seats = seats.len(), "Loaded users and seats");

    if users.len() < seats.len() && !args.allow_shortfall {
        return Err(AppError::validation(format!(
            "Only {} users for {} seats; pass --allow-shortfall to run anyway",
            users.len(),
            seats.len()
        )));
    }

    let released = store.reset_all_owners().await?;
    tracing::info!(released, "Released all seats");

    // ── Step 4: Concurrent allocation ────────────────────────────
    let allocator = SeatAllocator::from_config(Arc::new(store), &config.allocator);
    let report = allocator.allocate(&users).await?;

    for outcome in report.failures() {
        if let Some(reason) = outcome.failure() {
            tracing::warn!(user_id = %outcome.requester.user_id, %reason, "User got no seat");
        }
    }

    // ── Step 5: Display ──────────────────────────────────────────
    let seats = allocator.store().list_seats().await?;
    let map = SeatMap::from_bookings(&seats, &config.layout);

    println!("Took {:.3}s", report.elapsed().as_secs_f64());
    println!(
        "Claimed {} of {} seats for {} users ({} failed, {} conflicts)",
        report.claimed_count(),
        seats.len(),
        users.len(),
        report.failed_count(),
        report.conflict_count()
    );
    println!();
    print!("{map}");

    db.close().await;
    Ok(())
}
