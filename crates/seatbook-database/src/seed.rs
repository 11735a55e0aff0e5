//! Test-data generation: users, a trip, and the seat grid.
//!
//! Every table is only populated when empty, so seeding is safe to run on
//! each start.

use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use seatbook_core::config::{LayoutConfig, SeedConfig};
use seatbook_core::result::AppResult;
use seatbook_core::types::SeatNumber;

use crate::repositories::{BookingRepository, TripRepository, UserRepository};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Ivan", "John",
    "Ken", "Leslie", "Margaret", "Niklaus", "Radia", "Robin", "Shafi", "Tony", "Whitfield",
    "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Dijkstra", "Engelbart", "Hamilton", "Hopper", "Kay", "Knuth", "Lamport",
    "Liskov", "Lovelace", "McCarthy", "Milner", "Perlman", "Ritchie", "Shannon", "Thompson",
    "Turing", "Wirth", "Wozniak",
];

/// What a seeding run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Users inserted.
    pub users_created: u64,
    /// Trips inserted.
    pub trips_created: u64,
    /// Seats inserted.
    pub seats_created: u64,
}

/// Populate empty tables with generated users and the layout's seats.
pub async fn seed(pool: &PgPool, seed: &SeedConfig, layout: &LayoutConfig) -> AppResult<SeedSummary> {
    let users = UserRepository::new(pool.clone());
    let trips = TripRepository::new(pool.clone());
    let bookings = BookingRepository::new(pool.clone());
    let mut summary = SeedSummary::default();

    if users.count().await? == 0 {
        let names = generate_names(seed.users as usize);
        summary.users_created = users.insert_many(&names).await?;
        info!(count = summary.users_created, "Seeded users");
    } else {
        info!("Users already present, skipping user seeding");
    }

    if trips.find_by_airline(&layout.airline_name).await?.is_none() {
        trips.create(&layout.airline_name).await?;
        summary.trips_created = 1;
        info!(airline = %layout.airline_name, "Seeded trip");
    }

    if bookings.count().await? == 0 {
        let seats = seat_labels(layout)?;
        summary.seats_created = bookings.insert_seats(&layout.airline_name, &seats).await?;
        info!(count = summary.seats_created, "Seeded seats");
    } else {
        info!("Seats already present, skipping seat seeding");
    }

    Ok(summary)
}

/// Every seat label of the layout in row-major order: `1A, 1B, ..., 2A, ...`.
pub fn seat_labels(layout: &LayoutConfig) -> AppResult<Vec<SeatNumber>> {
    let mut seats = Vec::with_capacity(layout.capacity());
    for row in 1..=layout.rows {
        for col in 0..layout.seats_per_row {
            seats.push(SeatNumber::from_parts(row, col)?);
        }
    }
    Ok(seats)
}

/// Random "First Last" names.
pub fn generate_names(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
            format!("{first} {last}")
        })
        .collect()
}
