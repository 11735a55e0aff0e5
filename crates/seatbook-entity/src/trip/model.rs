//! Trip entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use seatbook_core::types::TripId;

/// A scheduled trip operated by an airline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    /// Unique trip identifier.
    pub trip_id: TripId,
    /// Operating airline.
    pub airline_name: String,
}
