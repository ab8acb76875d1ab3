//! Owner record.

use serde::{Deserialize, Serialize};

/// Surrogate key assigned by SQLite on insert.
pub type UserId = i64;

/// Owner of zero or more card options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
}
