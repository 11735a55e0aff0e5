//! The seat store contract consumed by the allocator.
//!
//! A store is a durable table of seats with a nullable owner. The allocator
//! only ever touches it through short transactions that lock a single free
//! row with skip-locked semantics.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;

use seatbook_core::result::AppResult;
use seatbook_core::types::{BookingId, RequesterId};
use seatbook_entity::booking::Booking;
use seatbook_entity::user::User;

/// A transactional seat table.
#[async_trait]
pub trait SeatStore: Send + Sync + 'static {
    /// Transaction handle returned by [`SeatStore::begin`].
    type Transaction: SeatTransaction;

    /// All requesters ordered by identifier.
    async fn list_requesters(&self) -> AppResult<Vec<User>>;

    /// All seats ordered by booking id.
    async fn list_seats(&self) -> AppResult<Vec<Booking>>;

    /// The committed seat owned by `requester`, if any.
    async fn seat_of(&self, requester: RequesterId) -> AppResult<Option<Booking>>;

    /// Clear the owner of every seat. Returns how many seats were released.
    async fn reset_all_owners(&self) -> AppResult<u64>;

    /// Open an isolated transaction bounded by `timeout`.
    async fn begin(&self, timeout: Duration) -> AppResult<Self::Transaction>;
}

/// One open transaction against a [`SeatStore`].
///
/// Dropping a transaction that was neither committed nor rolled back
/// discards its changes and releases its locks.
#[async_trait]
pub trait SeatTransaction: Send {
    /// Lock one free seat no other transaction holds. `None` when every free
    /// seat is currently locked elsewhere or none is left.
    async fn lock_one_available(&mut self) -> AppResult<Option<Booking>>;

    /// Assign the locked seat to `requester`. Fails with
    /// `ErrorKind::Conflict` if the seat already has an owner.
    async fn claim(&mut self, booking_id: BookingId, requester: RequesterId) -> AppResult<()>;

    /// Make the claim durable and release locks.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discard changes and release locks. Safe to call repeatedly and after
    /// a failed commit.
    async fn rollback(&mut self) -> AppResult<()>;
}
