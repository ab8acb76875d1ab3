//! Card option record.
//!
//! # Invariants
//! - `id` and `user_id` never change after insert.
//! - `is_default` is the only field mutated after creation.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Surrogate key assigned by SQLite on insert.
pub type CardOptionId = i64;

/// Dependent row carrying the per-user default flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardOption {
    pub id: CardOptionId,
    pub user_id: UserId,
    pub is_default: bool,
}

impl CardOption {
    /// Returns a copy with the default flag set to `is_default`.
    pub fn with_default(self, is_default: bool) -> Self {
        Self { is_default, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::CardOption;

    #[test]
    fn with_default_keeps_identity() {
        let option = CardOption {
            id: 7,
            user_id: 3,
            is_default: true,
        };
        let flipped = option.with_default(false);
        assert_eq!(flipped.id, 7);
        assert_eq!(flipped.user_id, 3);
        assert!(!flipped.is_default);
    }
}
