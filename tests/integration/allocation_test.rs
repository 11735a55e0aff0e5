//! Integration tests for concurrent allocation against PostgreSQL.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use seatbook_allocator::{FailureReason, PgSeatStore, SeatAllocator, SeatStore};

async fn allocator(db: &helpers::TestDb) -> (SeatAllocator<PgSeatStore>, Vec<seatbook_entity::User>) {
    let store = PgSeatStore::new(db.pool.clone());
    let users = store.list_requesters().await.unwrap();
    let allocator = SeatAllocator::from_config(Arc::new(store), &db.config.allocator);
    (allocator, users)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires PostgreSQL"]
async fn test_stress_120_users_120_seats() {
    let db = helpers::TestDb::with_data(120, 120).await;
    let (allocator, users) = allocator(&db).await;

    let report = allocator.allocate(&users).await.unwrap();

    assert_eq!(report.outcomes().len(), 120);
    assert_eq!(report.claimed_count(), 120);
    let seats: HashSet<_> = report.assignments().into_values().collect();
    assert_eq!(seats.len(), 120);

    let bookings = db.bookings();
    assert_eq!(bookings.count_available().await.unwrap(), 0);
    assert!(bookings.find_users_with_multiple_seats().await.unwrap().is_empty());

    let owners: HashSet<_> = bookings
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|b| b.user_id)
        .collect();
    assert_eq!(owners.len(), 120);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
async fn test_exhaustion_reports_shortfall() {
    let db = helpers::TestDb::with_data(5, 8).await;
    let (allocator, users) = allocator(&db).await;

    let report = allocator.allocate(&users).await.unwrap();

    assert_eq!(report.claimed_count(), 5);
    assert_eq!(report.failed_count(), 3);
    assert!(report.failures().all(|o| matches!(
        o.failure(),
        Some(FailureReason::NoResourceAvailable { .. })
    )));
    assert_eq!(db.bookings().count_available().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
async fn test_surplus_seats_stay_free() {
    let db = helpers::TestDb::with_data(30, 12).await;
    let (allocator, users) = allocator(&db).await;

    let report = allocator.allocate(&users).await.unwrap();

    assert_eq!(report.claimed_count(), 12);
    assert_eq!(db.bookings().count_available().await.unwrap(), 18);
    for user in &users {
        let held = db.bookings().find_by_user(user.user_id).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(
            report.outcome_for(user.user_id).and_then(|o| o.seat()),
            Some(&held[0].seat_number)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
async fn test_rerun_after_reset() {
    let db = helpers::TestDb::with_data(18, 18).await;
    let (allocator, users) = allocator(&db).await;

    assert_eq!(allocator.allocate(&users).await.unwrap().claimed_count(), 18);
    assert_eq!(allocator.store().reset_all_owners().await.unwrap(), 18);
    assert_eq!(allocator.allocate(&users).await.unwrap().claimed_count(), 18);
}
