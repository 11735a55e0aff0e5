//! Shared domain types.

pub mod id;
pub mod seat_number;

pub use id::{BookingId, RequesterId, TripId};
pub use seat_number::SeatNumber;
