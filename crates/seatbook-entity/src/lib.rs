//! # seatbook-entity
//!
//! Domain entity models for SeatBook. Every struct in this crate represents
//! a database table row or a value object derived from rows. Database
//! entities derive `sqlx::FromRow`.

pub mod booking;
pub mod trip;
pub mod user;

pub use booking::{Booking, SeatMap};
pub use trip::Trip;
pub use user::User;
