//! Booking entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use seatbook_core::types::{BookingId, RequesterId, SeatNumber};

/// One seat on a trip. The seat is free while `user_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    /// Unique booking row identifier.
    pub booking_id: BookingId,
    /// Airline the seat belongs to.
    pub airline_name: String,
    /// Seat label.
    #[sqlx(rename = "seatnumber")]
    pub seat_number: SeatNumber,
    /// Owner of the seat, if claimed.
    pub user_id: Option<RequesterId>,
}

impl Booking {
    /// Whether no user holds this seat.
    pub fn is_available(&self) -> bool {
        self.user_id.is_none()
    }
}
