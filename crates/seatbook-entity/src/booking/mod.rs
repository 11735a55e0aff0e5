//! Booking (seat) domain entities.

pub mod model;
pub mod seat_map;

pub use model::Booking;
pub use seat_map::SeatMap;
