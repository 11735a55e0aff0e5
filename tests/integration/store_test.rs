//! Integration tests for the PostgreSQL seat store and repositories.

mod helpers;

use std::time::Duration;

use seatbook_allocator::{PgSeatStore, SeatStore, SeatTransaction};
use seatbook_core::error::ErrorKind;
use seatbook_core::types::{BookingId, RequesterId};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_seed_is_skipped_when_tables_hold_rows() {
    let db = helpers::TestDb::new().await;
    let first = seatbook_database::seed::seed(&db.pool, &db.config.seed, &db.config.layout)
        .await
        .unwrap();
    assert_eq!(first.users_created, u64::from(db.config.seed.users));
    assert_eq!(first.seats_created as usize, db.config.layout.capacity());

    let second = seatbook_database::seed::seed(&db.pool, &db.config.seed, &db.config.layout)
        .await
        .unwrap();
    assert_eq!(second, Default::default());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_requesters_listed_in_id_order() {
    let db = helpers::TestDb::with_data(0, 5).await;
    let store = PgSeatStore::new(db.pool.clone());

    let ids: Vec<i32> = store
        .list_requesters()
        .await
        .unwrap()
        .iter()
        .map(|u| u.user_id.get())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let user = db.users().find_by_id(RequesterId(3)).await.unwrap().unwrap();
    assert_eq!(user.user_id, RequesterId(3));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_skip_locked_hands_out_distinct_rows() {
    let db = helpers::TestDb::with_data(2, 2).await;
    let store = PgSeatStore::new(db.pool.clone());

    let mut first = store.begin(TIMEOUT).await.unwrap();
    let mut second = store.begin(TIMEOUT).await.unwrap();
    let mut third = store.begin(TIMEOUT).await.unwrap();

    let a = first.lock_one_available().await.unwrap().unwrap();
    let b = second.lock_one_available().await.unwrap().unwrap();
    assert_ne!(a.booking_id, b.booking_id);
    assert!(third.lock_one_available().await.unwrap().is_none());

    first.rollback().await.unwrap();
    second.rollback().await.unwrap();
    third.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_rollback_mid_protocol_leaves_row_unowned_and_unlocked() {
    let db = helpers::TestDb::with_data(1, 1).await;
    let store = PgSeatStore::new(db.pool.clone());

    let mut tx = store.begin(TIMEOUT).await.unwrap();
    let seat = tx.lock_one_available().await.unwrap().unwrap();
    tx.claim(seat.booking_id, RequesterId(1)).await.unwrap();
    tx.rollback().await.unwrap();

    let seats = store.list_seats().await.unwrap();
    assert!(seats[0].user_id.is_none());

    let mut retry = store.begin(TIMEOUT).await.unwrap();
    let again = retry.lock_one_available().await.unwrap().unwrap();
    assert_eq!(again.booking_id, seat.booking_id);
    retry.rollback().await.unwrap();
    retry.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_seat_of_reads_committed_owner() {
    let db = helpers::TestDb::with_data(2, 2).await;
    let store = PgSeatStore::new(db.pool.clone());
    assert!(store.seat_of(RequesterId(1)).await.unwrap().is_none());

    let mut tx = store.begin(TIMEOUT).await.unwrap();
    tx.claim(BookingId(2), RequesterId(1)).await.unwrap();
    tx.commit().await.unwrap();

    let owned = store.seat_of(RequesterId(1)).await.unwrap().unwrap();
    assert_eq!(owned.booking_id, BookingId(2));
    assert!(store.seat_of(RequesterId(2)).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_claim_of_owned_seat_conflicts() {
    let db = helpers::TestDb::with_data(1, 2).await;
    let store = PgSeatStore::new(db.pool.clone());

    let mut tx = store.begin(TIMEOUT).await.unwrap();
    tx.claim(BookingId(1), RequesterId(1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut late = store.begin(TIMEOUT).await.unwrap();
    let err = late.claim(BookingId(1), RequesterId(2)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    late.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_second_seat_for_same_user_conflicts() {
    let db = helpers::TestDb::with_data(2, 1).await;
    let store = PgSeatStore::new(db.pool.clone());

    let mut tx = store.begin(TIMEOUT).await.unwrap();
    tx.claim(BookingId(1), RequesterId(1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut again = store.begin(TIMEOUT).await.unwrap();
    let err = again.claim(BookingId(2), RequesterId(1)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    again.rollback().await.unwrap();

    assert!(db.bookings().find_users_with_multiple_seats().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_reset_is_idempotent() {
    let db = helpers::TestDb::with_data(3, 3).await;
    let store = PgSeatStore::new(db.pool.clone());
    for (seat, user) in [(1, 1), (2, 2)] {
        let mut tx = store.begin(TIMEOUT).await.unwrap();
        tx.claim(BookingId(seat), RequesterId(user)).await.unwrap();
        tx.commit().await.unwrap();
    }

    assert_eq!(store.reset_all_owners().await.unwrap(), 2);
    let once = store.list_seats().await.unwrap();
    assert_eq!(store.reset_all_owners().await.unwrap(), 0);
    let twice = store.list_seats().await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(db.bookings().count_available().await.unwrap(), 3);
}
