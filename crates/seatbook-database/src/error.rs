//! Mapping from sqlx errors into the application error taxonomy.
//!
//! The allocator retries transient kinds, so the distinction between a
//! lost race and a broken store is made here, once, for every query.

use sqlx::error::DatabaseError;

use seatbook_core::error::{AppError, ErrorKind};

/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";
/// `lock_not_available`
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";
/// `idle_in_transaction_session_timeout`
const IDLE_IN_TRANSACTION_TIMEOUT: &str = "25P03";
/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a sqlx error.
pub fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut => ErrorKind::Contention,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => ErrorKind::Serialization,
        sqlx::Error::Database(db) => classify_code(db.as_ref()),
        _ => ErrorKind::Database,
    }
}

fn classify_code(db: &dyn DatabaseError) -> ErrorKind {
    match db.code().as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
            ErrorKind::Contention
        }
        Some(QUERY_CANCELED | IDLE_IN_TRANSACTION_TIMEOUT) => ErrorKind::Timeout,
        Some(UNIQUE_VIOLATION) => ErrorKind::Conflict,
        _ => ErrorKind::Database,
    }
}

/// Build a `map_err` adapter that wraps a sqlx error with `context`.
pub fn map_sqlx(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let kind = classify(&e);
        AppError::with_source(kind, format!("{context}: {e}"), e)
    }
}
