//! # seatbook-database
//!
//! PostgreSQL connection management, schema migrations, test-data seeding,
//! and the repositories behind the seat store.

pub mod connection;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod seed;

pub use connection::DatabasePool;
