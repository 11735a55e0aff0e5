//! Cabin layout and seeding configuration.

use serde::{Deserialize, Serialize};

/// Shape of the seat grid: `rows` rows of `seats_per_row` seats labelled
/// `1A`, `1B`, ... with an aisle after `aisle_after` columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Airline the seeded trip and bookings belong to.
    #[serde(default = "default_airline")]
    pub airline_name: String,
    /// Number of seat rows.
    #[serde(default = "default_rows")]
    pub rows: u16,
    /// Seats per row (at most 26).
    #[serde(default = "default_seats_per_row")]
    pub seats_per_row: u8,
    /// Column count left of the aisle.
    #[serde(default = "default_aisle_after")]
    pub aisle_after: u8,
}

impl LayoutConfig {
    /// Total number of seats in the layout.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.seats_per_row as usize
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            airline_name: default_airline(),
            rows: default_rows(),
            seats_per_row: default_seats_per_row(),
            aisle_after: default_aisle_after(),
        }
    }
}

/// Test-data generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Number of users to create when the users table is empty.
    #[serde(default = "default_users")]
    pub users: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
        }
    }
}

fn default_airline() -> String {
    "SeatBook Air".to_string()
}

fn default_rows() -> u16 {
    20
}

fn default_seats_per_row() -> u8 {
    6
}

fn default_aisle_after() -> u8 {
    3
}

fn default_users() -> u32 {
    120
}
