//! Fan-out/fan-in seat allocation.
//!
//! `allocate` spawns one task per requester on a `JoinSet` and joins them
//! all before returning. Each task runs the claim protocol (begin, lock one
//! free row with skip-locked semantics, claim, commit) until it succeeds,
//! exhausts its retry budget, or the run is aborted by a fatal store error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use seatbook_core::config::AllocatorConfig;
use seatbook_core::error::{AppError, ErrorKind};
use seatbook_core::result::AppResult;
use seatbook_core::types::RequesterId;
use seatbook_entity::booking::Booking;
use seatbook_entity::user::User;

use crate::report::{AllocationOutcome, AllocationReport, ClaimResult, FailureReason};
use crate::retry::RetryPolicy;
use crate::store::{SeatStore, SeatTransaction};

/// Assigns at most one free seat to each requester, concurrently.
#[derive(Debug)]
pub struct SeatAllocator<S: SeatStore> {
    store: Arc<S>,
    policy: RetryPolicy,
    transaction_timeout: Duration,
}

impl<S: SeatStore> SeatAllocator<S> {
    /// Create an allocator over `store`.
    pub fn new(store: Arc<S>, policy: RetryPolicy, transaction_timeout: Duration) -> Self {
        Self {
            store,
            policy,
            transaction_timeout,
        }
    }

    /// Create an allocator using the retry budget and transaction bound from
    /// configuration.
    pub fn from_config(store: Arc<S>, config: &AllocatorConfig) -> Self {
        Self::new(
            store,
            RetryPolicy::from_config(config),
            config.transaction_timeout(),
        )
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The retry policy applied to every requester.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Allocate seats for `requesters`.
    ///
    /// Returns once every task has finished. The report holds one outcome
    /// per requester in input order. A non-transient store failure stops
    /// the remaining tasks from retrying and is returned as `Err` after all
    /// of them have rolled back and been joined.
    pub async fn allocate(&self, requesters: &[User]) -> AppResult<AllocationReport> {
        if requesters.is_empty() {
            return Err(AppError::validation("No requesters to allocate seats for"));
        }

        let started = Instant::now();
        info!(
            requesters = requesters.len(),
            max_attempts = self.policy.max_attempts(),
            transaction_timeout_ms = self.transaction_timeout.as_millis() as u64,
            "Starting seat allocation"
        );

        let (abort_tx, abort_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for (index, requester) in requesters.iter().cloned().enumerate() {
            let worker = ClaimWorker {
                store: Arc::clone(&self.store),
                policy: self.policy.clone(),
                transaction_timeout: self.transaction_timeout,
                abort: abort_rx.clone(),
            };
            tasks.spawn(async move { (index, worker.run(requester).await) });
        }
        drop(abort_rx);

        let mut outcomes: Vec<Option<AllocationOutcome>> =
            (0..requesters.len()).map(|_| None).collect();
        let mut fatal: Option<AppError> = None;

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(outcome))) => {
                    outcomes[index] = Some(outcome);
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(join_err) => AppError::internal(format!("Claim task failed: {join_err}")),
            };

            if fatal.is_none() {
                error!(error = %failure, "Fatal store error, aborting allocation");
                abort_tx.send_replace(true);
                fatal = Some(failure);
            } else {
                debug!(error = %failure, "Additional task failure after abort");
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let outcomes = outcomes
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AppError::internal("Claim task finished without an outcome"))?;
        let report = AllocationReport::new(outcomes, started.elapsed());

        info!(
            claimed = report.claimed_count(),
            failed = report.failed_count(),
            conflicts = report.conflict_count(),
            attempts = report.total_attempts(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "Seat allocation finished"
        );
        Ok(report)
    }
}

/// Why a single claim attempt did not succeed.
#[derive(Debug)]
enum AttemptError {
    /// Lost a race or ran out of time. Retried.
    Contention(String),
    /// The seat already had an owner. Logged and retried.
    Conflict(AppError),
    /// Commit failed or the deadline passed after the claim was issued, so
    /// the seat may be owned anyway. Resolved from the store.
    Unsettled(String),
    /// The store is broken. Aborts the run.
    Store(AppError),
}

impl AttemptError {
    fn from_store(err: AppError) -> Self {
        match err.kind {
            ErrorKind::Conflict => Self::Conflict(err),
            _ if err.is_transient() => Self::Contention(err.to_string()),
            _ => Self::Store(err),
        }
    }
}

/// State owned by one requester's task.
struct ClaimWorker<S: SeatStore> {
    store: Arc<S>,
    policy: RetryPolicy,
    transaction_timeout: Duration,
    abort: watch::Receiver<bool>,
}

impl<S: SeatStore> ClaimWorker<S> {
    /// Retry the claim protocol until it succeeds, the budget runs out, or
    /// the run is aborted.
    async fn run(mut self, requester: User) -> AppResult<AllocationOutcome> {
        let max_attempts = self.policy.max_attempts();
        let mut last_failure = FailureReason::NoResourceAvailable {
            last_cause: "no attempt made".to_string(),
        };
        let mut maybe_committed = false;

        for attempt in 1..=max_attempts {
            let aborted = *self.abort.borrow();
            if aborted {
                debug!(user_id = %requester.user_id, "Allocation aborted, not retrying");
                return Ok(AllocationOutcome {
                    requester,
                    attempts: attempt - 1,
                    result: ClaimResult::Failed {
                        reason: FailureReason::NoResourceAvailable {
                            last_cause: "allocation aborted".to_string(),
                        },
                    },
                });
            }

            match self.claim_once(requester.user_id).await {
                Ok(booking) => {
                    debug!(
                        user_id = %requester.user_id,
                        seat = %booking.seat_number,
                        attempt,
                        "Seat claimed"
                    );
                    return Ok(claimed(requester, attempt, booking));
                }
                Err(AttemptError::Store(e)) => return Err(e),
                Err(AttemptError::Contention(cause)) => {
                    debug!(user_id = %requester.user_id, attempt, cause = %cause, "Claim attempt lost");
                    last_failure = FailureReason::NoResourceAvailable { last_cause: cause };
                }
                Err(AttemptError::Unsettled(cause)) => {
                    maybe_committed = true;
                    if let Some(booking) = self.settled_seat(requester.user_id).await? {
                        info!(
                            user_id = %requester.user_id,
                            seat = %booking.seat_number,
                            attempt,
                            cause = %cause,
                            "Claim landed despite failed acknowledgement"
                        );
                        return Ok(claimed(requester, attempt, booking));
                    }
                    debug!(user_id = %requester.user_id, attempt, cause = %cause, "Claim attempt not applied");
                    last_failure = FailureReason::NoResourceAvailable { last_cause: cause };
                }
                Err(AttemptError::Conflict(e)) => {
                    if maybe_committed {
                        if let Some(booking) = self.settled_seat(requester.user_id).await? {
                            info!(
                                user_id = %requester.user_id,
                                seat = %booking.seat_number,
                                attempt,
                                "Earlier claim already landed"
                            );
                            return Ok(claimed(requester, attempt, booking));
                        }
                    }
                    error!(
                        user_id = %requester.user_id,
                        attempt,
                        error = %e,
                        "Seat was already owned while locked"
                    );
                    last_failure = FailureReason::Conflict { message: e.message };
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.delay(attempt);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.abort.changed() => {}
                }
            }
        }

        if maybe_committed {
            if let Some(booking) = self.settled_seat(requester.user_id).await? {
                info!(
                    user_id = %requester.user_id,
                    seat = %booking.seat_number,
                    "Unsettled claim landed"
                );
                return Ok(claimed(requester, max_attempts, booking));
            }
        }

        warn!(
            user_id = %requester.user_id,
            attempts = max_attempts,
            reason = %last_failure,
            "Retry budget exhausted"
        );
        Ok(AllocationOutcome {
            requester,
            attempts: max_attempts,
            result: ClaimResult::Failed {
                reason: last_failure,
            },
        })
    }

    /// One bounded pass of the claim protocol. Any failure after `begin`
    /// rolls the transaction back before returning.
    async fn claim_once(&self, requester: RequesterId) -> Result<Booking, AttemptError> {
        let deadline = Instant::now() + self.transaction_timeout;

        let mut tx = match timeout_at(deadline, self.store.begin(self.transaction_timeout)).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) if e.is_transient() => return Err(AttemptError::Contention(e.to_string())),
            Ok(Err(e)) => return Err(AttemptError::Store(e)),
            Err(_) => {
                return Err(AttemptError::Contention(
                    "timed out opening a transaction".to_string(),
                ));
            }
        };

        let result = match timeout_at(deadline, run_protocol(&mut tx, requester)).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Unsettled(format!(
                "attempt exceeded {} ms",
                self.transaction_timeout.as_millis()
            ))),
        };

        if result.is_err() {
            match timeout(self.transaction_timeout, tx.rollback()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(user_id = %requester, error = %e, "Rollback failed"),
                Err(_) => warn!(user_id = %requester, "Rollback timed out, dropping transaction"),
            }
        }
        result
    }

    /// The seat the store records for `requester`, if any. A transient
    /// failure or timeout reads as no seat; the next attempt asks again.
    async fn settled_seat(&self, requester: RequesterId) -> AppResult<Option<Booking>> {
        match timeout(self.transaction_timeout, self.store.seat_of(requester)).await {
            Ok(Ok(seat)) => Ok(seat),
            Ok(Err(e)) if e.is_transient() => {
                debug!(user_id = %requester, error = %e, "Could not read back seat owner");
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(user_id = %requester, "Timed out reading back seat owner");
                Ok(None)
            }
        }
    }
}

fn claimed(requester: User, attempts: u32, booking: Booking) -> AllocationOutcome {
    AllocationOutcome {
        requester,
        attempts,
        result: ClaimResult::Claimed {
            booking_id: booking.booking_id,
            seat_number: booking.seat_number,
        },
    }
}

/// Lock, claim and commit inside an open transaction.
async fn run_protocol<T: SeatTransaction>(
    tx: &mut T,
    requester: RequesterId,
) -> Result<Booking, AttemptError> {
    let seat = tx
        .lock_one_available()
        .await
        .map_err(AttemptError::from_store)?
        .ok_or_else(|| AttemptError::Contention("no unlocked seat available".to_string()))?;

    tx.claim(seat.booking_id, requester)
        .await
        .map_err(AttemptError::from_store)?;

    tx.commit()
        .await
        .map_err(|e| AttemptError::Unsettled(format!("commit failed: {e}")))?;

    Ok(Booking {
        user_id: Some(requester),
        ..seat
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::memory::MemorySeatStore;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
    }

    fn allocator(store: &MemorySeatStore, max_attempts: u32) -> SeatAllocator<MemorySeatStore> {
        SeatAllocator::new(
            Arc::new(store.clone()),
            fast_policy(max_attempts),
            Duration::from_secs(5),
        )
    }

    async fn requesters(store: &MemorySeatStore) -> Vec<User> {
        store.list_requesters().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_stress_every_requester_gets_a_unique_seat() {
        let store = MemorySeatStore::generate(120, 120).unwrap();
        let users = requesters(&store).await;

        let report = allocator(&store, 5).allocate(&users).await.unwrap();

        assert_eq!(report.outcomes().len(), 120);
        assert_eq!(report.claimed_count(), 120);
        assert_eq!(report.failed_count(), 0);

        let claimed: HashSet<_> = report
            .outcomes()
            .iter()
            .filter_map(|o| match &o.result {
                ClaimResult::Claimed { booking_id, .. } => Some(*booking_id),
                ClaimResult::Failed { .. } => None,
            })
            .collect();
        assert_eq!(claimed.len(), 120);

        let seats = store.list_seats().await.unwrap();
        let owners: Vec<_> = seats.iter().filter_map(|s| s.user_id).collect();
        let unique_owners: HashSet<_> = owners.iter().collect();
        assert_eq!(owners.len(), 120);
        assert_eq!(unique_owners.len(), 120);
        assert_eq!(store.locked_count().unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exhaustion_fails_exactly_the_shortfall() {
        let store = MemorySeatStore::generate(5, 8).unwrap();
        let users = requesters(&store).await;

        let report = allocator(&store, 5).allocate(&users).await.unwrap();

        assert_eq!(report.claimed_count(), 5);
        assert_eq!(report.failed_count(), 3);
        assert_eq!(report.conflict_count(), 0);
        assert!(report.failures().all(|o| matches!(
            o.failure(),
            Some(FailureReason::NoResourceAvailable { .. })
        )));
        assert!(report.failures().all(|o| o.attempts == 5));

        let assigned: HashSet<_> = report.assignments().into_values().collect();
        assert_eq!(assigned.len(), 5);
        assert!(store.list_seats().await.unwrap().iter().all(|s| s.user_id.is_some()));
    }

    #[tokio::test]
    async fn test_report_follows_input_order() {
        let store = MemorySeatStore::generate(10, 10).unwrap();
        let mut users = requesters(&store).await;
        users.reverse();

        let report = allocator(&store, 3).allocate(&users).await.unwrap();

        let ids: Vec<i32> = report
            .outcomes()
            .iter()
            .map(|o| o.requester.user_id.get())
            .collect();
        assert_eq!(ids, (1..=10).rev().collect::<Vec<_>>());
        assert!(report.outcomes().iter().all(|o| o.is_claimed() && o.attempts == 1));
    }

    #[tokio::test]
    async fn test_failed_commits_are_retried() {
        let store = MemorySeatStore::generate(4, 4).unwrap();
        store.fail_next_commits(3);
        let users = requesters(&store).await;

        let report = allocator(&store, 5).allocate(&users).await.unwrap();

        assert_eq!(report.claimed_count(), 4);
        assert_eq!(report.total_attempts(), 7);
        assert_eq!(store.locked_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_never_leaves_half_claimed_rows() {
        let store = MemorySeatStore::generate(3, 3).unwrap();
        store.set_commit_delay(Duration::from_millis(50));
        let users = requesters(&store).await;
        let allocator = SeatAllocator::new(
            Arc::new(store.clone()),
            fast_policy(2),
            Duration::from_millis(10),
        );

        let report = allocator.allocate(&users).await.unwrap();

        assert_eq!(report.claimed_count(), 0);
        assert_eq!(report.failed_count(), 3);
        assert!(report.outcomes().iter().all(|o| o.attempts == 2));
        assert!(store.list_seats().await.unwrap().iter().all(Booking::is_available));
        assert_eq!(store.locked_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_late_commit_ack_is_resolved_from_store() {
        let store = MemorySeatStore::generate(2, 1).unwrap();
        store.set_commit_ack_delay(Duration::from_millis(100));
        let users = requesters(&store).await;
        let allocator = SeatAllocator::new(
            Arc::new(store.clone()),
            fast_policy(3),
            Duration::from_millis(30),
        );

        let report = allocator.allocate(&users).await.unwrap();

        let outcome = &report.outcomes()[0];
        assert!(outcome.is_claimed());
        assert_eq!(report.conflict_count(), 0);
        let owned = store.seat_of(users[0].user_id).await.unwrap().unwrap();
        assert_eq!(outcome.seat(), Some(&owned.seat_number));
        let owners = store
            .list_seats()
            .await
            .unwrap()
            .iter()
            .filter(|s| s.user_id.is_some())
            .count();
        assert_eq!(owners, 1);
        assert_eq!(store.locked_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_requester_reports_conflict() {
        let store = MemorySeatStore::generate(3, 1).unwrap();
        let user = requesters(&store).await.remove(0);
        let users = vec![user.clone(), user];

        let report = allocator(&store, 3).allocate(&users).await.unwrap();

        assert_eq!(report.claimed_count(), 1);
        assert_eq!(report.conflict_count(), 1);
        let owned = store
            .list_seats()
            .await
            .unwrap()
            .iter()
            .filter(|s| s.user_id.is_some())
            .count();
        assert_eq!(owned, 1);
        assert_eq!(store.locked_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_run() {
        let store = MemorySeatStore::generate(4, 4).unwrap();
        let users = requesters(&store).await;
        store.set_unreachable(true);

        let err = allocator(&store, 5).allocate(&users).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        store.set_unreachable(false);
        assert_eq!(store.locked_count().unwrap(), 0);
        assert!(store.list_seats().await.unwrap().iter().all(Booking::is_available));
    }

    #[tokio::test]
    async fn test_store_lost_mid_run_wakes_backoff_and_releases_locks() {
        let store = MemorySeatStore::generate(1, 3).unwrap();
        store.set_commit_delay(Duration::from_millis(200));
        let users = requesters(&store).await;
        let allocator = SeatAllocator::new(
            Arc::new(store.clone()),
            RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(10)),
            Duration::from_secs(5),
        );

        let run = async {
            tokio::join!(allocator.allocate(&users), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                store.set_unreachable(true);
            })
            .0
        };
        let err = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("backoff sleeps were not woken by the abort")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        store.set_unreachable(false);
        assert_eq!(store.locked_count().unwrap(), 0);
        assert!(store.list_seats().await.unwrap().iter().all(Booking::is_available));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let store = MemorySeatStore::generate(1, 0).unwrap();
        let err = allocator(&store, 1).allocate(&[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_second_run_after_reset_reuses_seats() {
        let store = MemorySeatStore::generate(6, 6).unwrap();
        let users = requesters(&store).await;
        let allocator = allocator(&store, 5);

        assert_eq!(allocator.allocate(&users).await.unwrap().claimed_count(), 6);
        assert_eq!(store.reset_all_owners().await.unwrap(), 6);
        assert_eq!(allocator.allocate(&users).await.unwrap().claimed_count(), 6);
    }
}
