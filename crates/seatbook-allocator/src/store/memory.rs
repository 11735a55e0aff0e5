//! In-memory seat store for single-process runs and tests.
//!
//! Emulates the parts of PostgreSQL the claim protocol depends on: row
//! locks held until commit or rollback, skip-locked reads, a guarded owner
//! update, and one seat per user. Faults (unreachable store, failing or
//! slow commits) can be injected to exercise the allocator's error paths.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use seatbook_core::error::AppError;
use seatbook_core::result::AppResult;
use seatbook_core::types::{BookingId, RequesterId, SeatNumber};
use seatbook_entity::booking::Booking;
use seatbook_entity::user::User;

use super::{SeatStore, SeatTransaction};

/// Seats per generated row.
const GENERATED_ROW_WIDTH: usize = 6;

/// A seat row plus the transaction currently holding its lock.
#[derive(Debug)]
struct Row {
    booking: Booking,
    locked_by: Option<u64>,
}

#[derive(Debug, Default)]
struct Table {
    users: Vec<User>,
    rows: Vec<Row>,
}

impl Table {
    fn release_locks(&mut self, tx_id: u64) {
        for row in self.rows.iter_mut().filter(|r| r.locked_by == Some(tx_id)) {
            row.locked_by = None;
        }
    }

    fn owns_seat(&self, requester: RequesterId) -> bool {
        self.rows
            .iter()
            .any(|r| r.booking.user_id == Some(requester))
    }
}

#[derive(Debug)]
struct Inner {
    table: Mutex<Table>,
    next_tx: AtomicU64,
    unreachable: AtomicBool,
    failing_commits: AtomicUsize,
    commit_delay_ms: AtomicU64,
    commit_ack_delay_ms: AtomicU64,
}

impl Inner {
    fn table(&self) -> AppResult<MutexGuard<'_, Table>> {
        self.table
            .lock()
            .map_err(|_| AppError::internal("Seat table lock poisoned"))
    }

    fn ensure_reachable(&self) -> AppResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::database("Seat store is unreachable"));
        }
        Ok(())
    }
}

fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Seat store holding its table in process memory.
#[derive(Debug, Clone)]
pub struct MemorySeatStore {
    inner: Arc<Inner>,
}

impl MemorySeatStore {
    /// Create a store from users and seats. Both are kept ordered by id.
    pub fn new(mut users: Vec<User>, mut seats: Vec<Booking>) -> Self {
        users.sort_by_key(|u| u.user_id);
        seats.sort_by_key(|b| b.booking_id);
        let rows = seats
            .into_iter()
            .map(|booking| Row {
                booking,
                locked_by: None,
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(Table { users, rows }),
                next_tx: AtomicU64::new(1),
                unreachable: AtomicBool::new(false),
                failing_commits: AtomicUsize::new(0),
                commit_delay_ms: AtomicU64::new(0),
                commit_ack_delay_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Create a store with `seat_count` free seats (`1A`, `1B`, ... six per
    /// row) and `requester_count` users with ids starting at 1.
    pub fn generate(seat_count: usize, requester_count: usize) -> AppResult<Self> {
        let max_requester = i32::try_from(requester_count)
            .map_err(|_| AppError::validation("Too many requesters to generate"))?;
        let max_seat = i32::try_from(seat_count)
            .map_err(|_| AppError::validation("Too many seats to generate"))?;

        let users = (1..=max_requester)
            .map(|id| User::new(id, format!("Passenger {id}")))
            .collect();
        let seats = (1..=max_seat)
            .zip(0usize..)
            .map(|(id, index)| -> AppResult<Booking> {
                let row = u16::try_from(index / GENERATED_ROW_WIDTH + 1)
                    .map_err(|_| AppError::validation("Too many seats to generate"))?;
                let column = (index % GENERATED_ROW_WIDTH) as u8;
                Ok(Booking {
                    booking_id: BookingId(id),
                    airline_name: "Memory Air".to_string(),
                    seat_number: SeatNumber::from_parts(row, column)?,
                    user_id: None,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self::new(users, seats))
    }

    /// Make every subsequent operation fail as if the store were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make the next `count` commits fail and discard their changes.
    pub fn fail_next_commits(&self, count: usize) {
        self.inner.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Delay every commit by `delay` before it is applied.
    pub fn set_commit_delay(&self, delay: Duration) {
        self.inner
            .commit_delay_ms
            .store(saturating_millis(delay), Ordering::SeqCst);
    }

    /// Delay the acknowledgement of every successful commit by `delay`
    /// after its changes are already visible.
    pub fn set_commit_ack_delay(&self, delay: Duration) {
        self.inner
            .commit_ack_delay_ms
            .store(saturating_millis(delay), Ordering::SeqCst);
    }

    /// Number of seats currently locked by open transactions.
    pub fn locked_count(&self) -> AppResult<usize> {
        let table = self.inner.table()?;
        Ok(table.rows.iter().filter(|r| r.locked_by.is_some()).count())
    }
}

#[async_trait]
impl SeatStore for MemorySeatStore {
    type Transaction = MemorySeatTransaction;

    async fn list_requesters(&self) -> AppResult<Vec<User>> {
        self.inner.ensure_reachable()?;
        Ok(self.inner.table()?.users.clone())
    }

    async fn list_seats(&self) -> AppResult<Vec<Booking>> {
        self.inner.ensure_reachable()?;
        let table = self.inner.table()?;
        Ok(table.rows.iter().map(|r| r.booking.clone()).collect())
    }

    async fn seat_of(&self, requester: RequesterId) -> AppResult<Option<Booking>> {
        self.inner.ensure_reachable()?;
        let table = self.inner.table()?;
        Ok(table
            .rows
            .iter()
            .find(|r| r.booking.user_id == Some(requester))
            .map(|r| r.booking.clone()))
    }

    async fn reset_all_owners(&self) -> AppResult<u64> {
        self.inner.ensure_reachable()?;
        let mut table = self.inner.table()?;
        let mut released = 0;
        for row in table.rows.iter_mut().filter(|r| r.booking.user_id.is_some()) {
            row.booking.user_id = None;
            released += 1;
        }
        info!(released, "Reset seat owners");
        Ok(released)
    }

    async fn begin(&self, _timeout: Duration) -> AppResult<MemorySeatTransaction> {
        self.inner.ensure_reachable()?;
        Ok(MemorySeatTransaction {
            inner: Arc::clone(&self.inner),
            id: self.inner.next_tx.fetch_add(1, Ordering::SeqCst),
            pending: Vec::new(),
            open: true,
        })
    }
}

/// An open in-memory transaction. Locks are released on commit, rollback
/// or drop; claims become visible only on commit.
#[derive(Debug)]
pub struct MemorySeatTransaction {
    inner: Arc<Inner>,
    id: u64,
    pending: Vec<(BookingId, RequesterId)>,
    open: bool,
}

impl MemorySeatTransaction {
    fn ensure_open(&self) -> AppResult<()> {
        if !self.open {
            return Err(AppError::internal("Transaction already finished"));
        }
        self.inner.ensure_reachable()
    }

    /// Release locks and forget pending claims.
    fn finish(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.pending.clear();
        let mut table = self
            .inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        table.release_locks(self.id);
    }

    fn apply_pending(&self) -> AppResult<()> {
        let mut table = self.inner.table()?;

        for &(booking_id, requester) in &self.pending {
            let row = table
                .rows
                .iter()
                .find(|r| r.booking.booking_id == booking_id)
                .ok_or_else(|| AppError::not_found(format!("Booking {booking_id} not found")))?;
            if row.booking.user_id.is_some() {
                return Err(AppError::conflict(format!(
                    "Booking {booking_id} was claimed concurrently"
                )));
            }
            if table.owns_seat(requester) {
                return Err(AppError::conflict(format!(
                    "User {requester} already owns a seat"
                )));
            }
        }

        for &(booking_id, requester) in &self.pending {
            if let Some(row) = table
                .rows
                .iter_mut()
                .find(|r| r.booking.booking_id == booking_id)
            {
                row.booking.user_id = Some(requester);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SeatTransaction for MemorySeatTransaction {
    async fn lock_one_available(&mut self) -> AppResult<Option<Booking>> {
        self.ensure_open()?;
        let mut table = self.inner.table()?;
        let id = self.id;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.booking.user_id.is_none() && r.locked_by.is_none());

        Ok(row.map(|r| {
            r.locked_by = Some(id);
            r.booking.clone()
        }))
    }

    async fn claim(&mut self, booking_id: BookingId, requester: RequesterId) -> AppResult<()> {
        self.ensure_open()?;
        let mut table = self.inner.table()?;
        if table.owns_seat(requester) {
            return Err(AppError::conflict(format!(
                "User {requester} already owns a seat"
            )));
        }
        let id = self.id;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.booking.booking_id == booking_id)
            .ok_or_else(|| AppError::not_found(format!("Booking {booking_id} not found")))?;

        if row.booking.user_id.is_some() {
            return Err(AppError::conflict(format!(
                "Booking {booking_id} is no longer available"
            )));
        }
        match row.locked_by {
            Some(holder) if holder != id => {
                return Err(AppError::conflict(format!(
                    "Booking {booking_id} is locked by another transaction"
                )));
            }
            _ => row.locked_by = Some(id),
        }

        self.pending.push((booking_id, requester));
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        if !self.open {
            return Err(AppError::internal("Transaction already finished"));
        }

        let delay_ms = self.inner.commit_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Err(e) = self.inner.ensure_reachable() {
            self.finish();
            return Err(e);
        }

        let injected = self
            .inner
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            self.finish();
            return Err(AppError::database("Injected commit failure"));
        }

        let applied = self.apply_pending();
        self.finish();
        applied?;

        let ack_delay_ms = self.inner.commit_ack_delay_ms.load(Ordering::SeqCst);
        if ack_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(ack_delay_ms)).await;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.finish();
        Ok(())
    }
}

impl Drop for MemorySeatTransaction {
    fn drop(&mut self) {
        self.finish();
    }
}
