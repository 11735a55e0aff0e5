//! # seatbook-allocator
//!
//! Concurrent seat allocation. Every requester gets its own task which
//! claims at most one free seat through a short transactional protocol:
//! lock one unlocked free row (skipping rows other transactions hold),
//! assign it, commit. Lost races are retried with exponential backoff;
//! store failures abort the whole run.
//!
//! ## Modules
//!
//! - `store`: the seat store contract with PostgreSQL and in-memory backends
//! - `retry`: bounded exponential backoff
//! - `allocator`: fan-out/fan-in driver and the claim protocol
//! - `report`: per-requester outcomes of a run

pub mod allocator;
pub mod report;
pub mod retry;
pub mod store;

pub use allocator::SeatAllocator;
pub use report::{AllocationOutcome, AllocationReport, ClaimResult, FailureReason};
pub use retry::RetryPolicy;
pub use store::memory::MemorySeatStore;
pub use store::postgres::PgSeatStore;
pub use store::{SeatStore, SeatTransaction};
