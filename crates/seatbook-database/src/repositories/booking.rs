//! Booking (seat) repository implementation.
//!
//! Pool-level methods serve reporting, reset and seeding. The associated
//! functions taking a `PgConnection` run inside a caller-owned transaction
//! and implement the lock and claim steps of the claim protocol.

use std::time::Duration;

use sqlx::{PgConnection, PgPool};

use seatbook_core::error::AppError;
use seatbook_core::result::AppResult;
use seatbook_core::types::{BookingId, RequesterId, SeatNumber};
use seatbook_entity::booking::Booking;

use crate::error::map_sqlx;

/// Repository for seat rows in the `bookings` table.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every seat ordered by booking id.
    pub async fn find_all(&self) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT booking_id, airline_name, seatnumber, user_id FROM bookings \
             ORDER BY booking_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx("Failed to list bookings"))
    }

    /// Find the seats held by a user.
    pub async fn find_by_user(&self, user_id: RequesterId) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT booking_id, airline_name, seatnumber, user_id FROM bookings \
             WHERE user_id = $1 ORDER BY booking_id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx("Failed to find bookings by user"))
    }

    /// Count all seats.
    pub async fn count(&self) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx("Failed to count bookings"))?;
        Ok(total as u64)
    }

    /// Count seats without an owner.
    pub async fn count_available(&self) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx("Failed to count available bookings"))?;
        Ok(total as u64)
    }

    /// Users that own more than one seat. Always empty unless the
    /// one-seat-per-user index was dropped.
    pub async fn find_users_with_multiple_seats(&self) -> AppResult<Vec<RequesterId>> {
        sqlx::query_scalar::<_, RequesterId>(
            "SELECT user_id FROM bookings WHERE user_id IS NOT NULL \
             GROUP BY user_id HAVING COUNT(*) > 1 ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx("Failed to check seat ownership"))
    }

    /// Clear the owner of every seat. Returns the number of seats released.
    pub async fn reset_all_owners(&self) -> AppResult<u64> {
        let result = sqlx::query("UPDATE bookings SET user_id = NULL WHERE user_id IS NOT NULL")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx("Failed to reset bookings"))?;
        Ok(result.rows_affected())
    }

    /// Insert free seats for `airline_name`, skipping labels that already
    /// exist. Returns the number of rows inserted.
    pub async fn insert_seats(&self, airline_name: &str, seats: &[SeatNumber]) -> AppResult<u64> {
        let labels: Vec<String> = seats.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query(
            "INSERT INTO bookings (airline_name, seatnumber) \
             SELECT $1, s FROM UNNEST($2::text[]) WITH ORDINALITY AS t(s, ord) ORDER BY ord \
             ON CONFLICT (airline_name, seatnumber) DO NOTHING",
        )
        .bind(airline_name)
        .bind(&labels)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx("Failed to insert seats"))?;
        Ok(result.rows_affected())
    }

    /// Bound every statement of the current transaction by `timeout` and
    /// abort the transaction if it idles longer than that.
    pub async fn set_local_timeouts(conn: &mut PgConnection, timeout: Duration) -> AppResult<()> {
        let millis = timeout.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx("Failed to set statement timeout"))?;
        sqlx::query(&format!(
            "SET LOCAL idle_in_transaction_session_timeout = {millis}"
        ))
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to set idle transaction timeout"))?;
        Ok(())
    }

    /// Lock the first free seat that no other transaction has locked.
    ///
    /// Rows locked by concurrent transactions are skipped rather than
    /// waited on, so `None` only means nothing was lockable at this instant.
    pub async fn lock_next_available(conn: &mut PgConnection) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT booking_id, airline_name, seatnumber, user_id FROM bookings \
             WHERE user_id IS NULL \
             ORDER BY booking_id \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED",
        )
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to lock an available seat"))
    }

    /// Assign a locked seat to `user_id`.
    ///
    /// The owner guard turns a concurrent write that slipped past the row
    /// lock into a conflict instead of an overwrite.
    pub async fn claim(
        conn: &mut PgConnection,
        booking_id: BookingId,
        user_id: RequesterId,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET user_id = $1 WHERE booking_id = $2 AND user_id IS NULL",
        )
        .bind(user_id)
        .bind(booking_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx("Failed to claim seat"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "Booking {booking_id} is no longer available"
            )));
        }
        Ok(())
    }
}
