//! Shared test helpers for integration tests.
//!
//! Tests run against the database named by `SEATBOOK_TEST_DATABASE_URL`
//! and are serialized through a process-wide lock because they share its
//! tables.

#![allow(dead_code)]

use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

use seatbook_core::config::AppConfig;
use seatbook_database::connection::DatabasePool;
use seatbook_database::repositories::{BookingRepository, TripRepository, UserRepository};
use seatbook_database::seed;

/// Environment variable holding the test database URL.
pub const DATABASE_URL_VAR: &str = "SEATBOOK_TEST_DATABASE_URL";

static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// A freshly reset test database.
pub struct TestDb {
    /// Database pool for direct queries
    pub pool: PgPool,
    /// Application config pointing at the test database
    pub config: AppConfig,
    _guard: MutexGuard<'static, ()>,
}

impl TestDb {
    /// Connect, migrate, and empty every table.
    pub async fn new() -> Self {
        let guard = DB_LOCK.lock().await;

        let mut config =
            AppConfig::load("config/default.toml").expect("Failed to load default config");
        config.database.url = std::env::var(DATABASE_URL_VAR)
            .unwrap_or_else(|_| panic!("{DATABASE_URL_VAR} must be set"));
        config.database.max_connections = 40;

        DatabasePool::ensure_database(&config.database)
            .await
            .expect("Failed to create test database");
        let pool = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test database")
            .into_pool();
        seatbook_database::migration::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query("TRUNCATE bookings, trips, users RESTART IDENTITY")
            .execute(&pool)
            .await
            .expect("Failed to clean database");

        Self {
            pool,
            config,
            _guard: guard,
        }
    }

    /// Create a database with `seats` free seats and `users` users.
    pub async fn with_data(seats: usize, users: usize) -> Self {
        let db = Self::new().await;
        db.insert_users(users).await;
        db.insert_seats(seats).await;
        db
    }

    /// Insert `count` users with ids `1..=count`.
    pub async fn insert_users(&self, count: usize) {
        let names = seed::generate_names(count);
        let inserted = UserRepository::new(self.pool.clone())
            .insert_many(&names)
            .await
            .expect("Failed to insert users");
        assert_eq!(inserted as usize, count);
    }

    /// Insert the first `count` seats of the configured layout.
    pub async fn insert_seats(&self, count: usize) {
        let layout = &self.config.layout;
        let labels = seed::seat_labels(layout).expect("Invalid layout");
        assert!(count <= labels.len(), "Layout has only {} seats", labels.len());

        TripRepository::new(self.pool.clone())
            .create(&layout.airline_name)
            .await
            .expect("Failed to create trip");
        let inserted = self
            .bookings()
            .insert_seats(&layout.airline_name, &labels[..count])
            .await
            .expect("Failed to insert seats");
        assert_eq!(inserted as usize, count);
    }

    /// Booking repository over the test pool.
    pub fn bookings(&self) -> BookingRepository {
        BookingRepository::new(self.pool.clone())
    }

    /// User repository over the test pool.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }
}
