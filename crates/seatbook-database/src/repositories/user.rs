//! User repository implementation.

use sqlx::PgPool;

use seatbook_core::result::AppResult;
use seatbook_core::types::RequesterId;
use seatbook_entity::user::User;

use crate::error::map_sqlx;

/// Repository for reading and bulk-creating users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: RequesterId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT user_id, name FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx("Failed to find user by id"))
    }

    /// List every user ordered by identifier.
    pub async fn find_all(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT user_id, name FROM users ORDER BY user_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx("Failed to list users"))
    }

    /// Count all users.
    pub async fn count(&self) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx("Failed to count users"))?;
        Ok(total as u64)
    }

    /// Insert one user per name. Returns the number of rows inserted.
    pub async fn insert_many(&self, names: &[String]) -> AppResult<u64> {
        let result = sqlx::query("INSERT INTO users (name) SELECT n FROM UNNEST($1::text[]) AS n")
            .bind(names)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx("Failed to insert users"))?;
        Ok(result.rows_affected())
    }
}
