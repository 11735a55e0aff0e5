//! PostgreSQL seat store.
//!
//! Each transaction owns one pooled connection for its lifetime and hands it
//! back on commit, rollback or drop, so no connection is held across retries.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use seatbook_core::error::AppError;
use seatbook_core::result::AppResult;
use seatbook_core::types::{BookingId, RequesterId};
use seatbook_database::error::map_sqlx;
use seatbook_database::repositories::{BookingRepository, UserRepository};
use seatbook_entity::booking::Booking;
use seatbook_entity::user::User;

use super::{SeatStore, SeatTransaction};

/// Seat store backed by the `bookings` and `users` tables.
#[derive(Debug, Clone)]
pub struct PgSeatStore {
    pool: PgPool,
    users: UserRepository,
    bookings: BookingRepository,
}

impl PgSeatStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl SeatStore for PgSeatStore {
    type Transaction = PgSeatTransaction;

    async fn list_requesters(&self) -> AppResult<Vec<User>> {
        self.users.find_all().await
    }

    async fn list_seats(&self) -> AppResult<Vec<Booking>> {
        self.bookings.find_all().await
    }

    async fn seat_of(&self, requester: RequesterId) -> AppResult<Option<Booking>> {
        Ok(self.bookings.find_by_user(requester).await?.into_iter().next())
    }

    async fn reset_all_owners(&self) -> AppResult<u64> {
        self.bookings.reset_all_owners().await
    }

    async fn begin(&self, timeout: Duration) -> AppResult<PgSeatTransaction> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_sqlx("Failed to begin transaction"))?;

        if let Err(e) = BookingRepository::set_local_timeouts(&mut tx, timeout).await {
            if let Err(rollback_err) = tx.rollback().await {
                debug!(error = %rollback_err, "Rollback after failed SET LOCAL also failed");
            }
            return Err(e);
        }

        Ok(PgSeatTransaction { tx: Some(tx) })
    }
}

/// An open PostgreSQL transaction. `None` once committed or rolled back.
pub struct PgSeatTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl std::fmt::Debug for PgSeatTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSeatTransaction")
            .field("open", &self.tx.is_some())
            .finish()
    }
}

impl PgSeatTransaction {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::internal("Transaction already finished"))
    }
}

#[async_trait]
impl SeatTransaction for PgSeatTransaction {
    async fn lock_one_available(&mut self) -> AppResult<Option<Booking>> {
        BookingRepository::lock_next_available(self.conn()?).await
    }

    async fn claim(&mut self, booking_id: BookingId, requester: RequesterId) -> AppResult<()> {
        BookingRepository::claim(self.conn()?, booking_id, requester).await
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::internal("Transaction already finished"))?;
        tx.commit()
            .await
            .map_err(map_sqlx("Failed to commit transaction"))
    }

    async fn rollback(&mut self) -> AppResult<()> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(map_sqlx("Failed to roll back transaction")),
            None => Ok(()),
        }
    }
}
