//! Repository implementations for the booking schema.

pub mod booking;
pub mod trip;
pub mod user;

pub use booking::BookingRepository;
pub use trip::TripRepository;
pub use user::UserRepository;
