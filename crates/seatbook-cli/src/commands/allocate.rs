//! Allocation command.
//!
//! Runs the concurrent allocator for every user, either against the
//! database or, with `--dry-run`, against an in-memory copy of it.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use seatbook_allocator::{
    AllocationReport, ClaimResult, MemorySeatStore, PgSeatStore, SeatAllocator, SeatStore,
};
use seatbook_core::config::AppConfig;
use seatbook_core::error::AppError;
use seatbook_entity::booking::SeatMap;

use crate::output::{self, OutputFormat};

/// Arguments for the allocate command
#[derive(Debug, Args)]
pub struct AllocateArgs {
    /// Release every seat before allocating
    #[arg(long)]
    pub reset: bool,

    /// Allocate against an in-memory snapshot and leave the database untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Print the seat map after the run
    #[arg(long)]
    pub map: bool,
}

/// Outcome display row for table output
#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    /// User ID
    user_id: i32,
    /// Name
    name: String,
    /// Attempts
    attempts: u32,
    /// Seat
    seat: String,
    /// Result
    result: String,
}

/// Execute the allocate command
pub async fn execute(
    args: &AllocateArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let pg_store = PgSeatStore::new(pool.clone());

    let result = if args.dry_run {
        let users = pg_store.list_requesters().await?;
        let seats = pg_store.list_seats().await?;
        tracing::info!(
            users = users.len(),
            seats = seats.len(),
            "Allocating against an in-memory snapshot"
        );
        let snapshot = MemorySeatStore::new(users, seats);
        run(snapshot, args, &config, format).await
    } else {
        run(pg_store, args, &config, format).await
    };

    pool.close().await;
    result
}

async fn run<S: SeatStore>(
    store: S,
    args: &AllocateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    if args.reset {
        let released = store.reset_all_owners().await?;
        if format == OutputFormat::Table {
            output::print_success(&format!("Released {released} seat(s)."));
        }
    }

    let users = store.list_requesters().await?;
    if users.is_empty() {
        return Err(AppError::validation("No users found, run `seed` first"));
    }

    let allocator = SeatAllocator::from_config(Arc::new(store), &config.allocator);
    let report = allocator.allocate(&users).await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            print_report(&report, args.dry_run);
            if args.map {
                let seats = allocator.store().list_seats().await?;
                println!();
                print!("{}", SeatMap::from_bookings(&seats, &config.layout));
            }
        }
    }
    Ok(())
}

fn print_report(report: &AllocationReport, dry_run: bool) {
    let rows: Vec<OutcomeRow> = report
        .outcomes()
        .iter()
        .map(|o| OutcomeRow {
            user_id: o.requester.user_id.get(),
            name: o.requester.name.clone(),
            attempts: o.attempts,
            seat: o.seat().map(|s| s.to_string()).unwrap_or_default(),
            result: match &o.result {
                ClaimResult::Claimed { .. } => "claimed".to_string(),
                ClaimResult::Failed { reason } => reason.to_string(),
            },
        })
        .collect();
    output::print_list(&rows, OutputFormat::Table);

    if dry_run {
        output::print_warning("Dry run: the database was not modified.");
    }
    output::print_kv("Elapsed", &format!("{:.3}s", report.elapsed().as_secs_f64()));
    output::print_kv("Claimed", &report.claimed_count().to_string());
    output::print_kv("Failed", &report.failed_count().to_string());
    output::print_kv("Conflicts", &report.conflict_count().to_string());
    output::print_kv("Attempts", &report.total_attempts().to_string());
    if report.failed_count() > 0 {
        output::print_warning("Some users did not get a seat.");
    }
}
