//! Trip repository implementation.

use sqlx::PgPool;

use seatbook_core::result::AppResult;
use seatbook_entity::trip::Trip;

use crate::error::map_sqlx;

/// Repository for trips.
#[derive(Debug, Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    /// Create a new trip repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the first trip operated by `airline_name`.
    pub async fn find_by_airline(&self, airline_name: &str) -> AppResult<Option<Trip>> {
        sqlx::query_as::<_, Trip>(
            "SELECT trip_id, airline_name FROM trips WHERE airline_name = $1 \
             ORDER BY trip_id LIMIT 1",
        )
        .bind(airline_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("Failed to find trip"))
    }

    /// Create a trip.
    pub async fn create(&self, airline_name: &str) -> AppResult<Trip> {
        sqlx::query_as::<_, Trip>(
            "INSERT INTO trips (airline_name) VALUES ($1) RETURNING trip_id, airline_name",
        )
        .bind(airline_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx("Failed to create trip"))
    }
}
