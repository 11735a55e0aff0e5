//! User entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use seatbook_core::types::RequesterId;

/// A passenger competing for a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub user_id: RequesterId,
    /// Display name.
    pub name: String,
}

impl User {
    /// Create a user value.
    pub fn new(user_id: impl Into<RequesterId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}
