//! Explicit change tracking for default flags.
//!
//! # Responsibility
//! - Compare a loaded snapshot with an edited copy and list the rows whose
//!   default flag actually changed.
//!
//! # Invariants
//! - Rows are paired by `id`; rows missing from either side are ignored.
//! - Unchanged rows never produce a `FlagChange`, so they are never written.

use crate::model::card_option::{CardOption, CardOptionId};
use crate::model::user::UserId;
use std::collections::HashMap;

/// One pending default-flag write.
///
/// `was_default` is the value the writer expects to find in storage; the
/// repository refuses the write when the stored value differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub card_option_id: CardOptionId,
    pub user_id: UserId,
    pub was_default: bool,
    pub is_default: bool,
}

impl FlagChange {
    /// Builds the change turning `option` into a row flagged `is_default`.
    pub fn set(option: &CardOption, is_default: bool) -> Self {
        Self {
            card_option_id: option.id,
            user_id: option.user_id,
            was_default: option.is_default,
            is_default,
        }
    }
}

/// Lists modified rows, in `after` order.
pub fn diff_flags(before: &[CardOption], after: &[CardOption]) -> Vec<FlagChange> {
    let original: HashMap<CardOptionId, bool> = before
        .iter()
        .map(|option| (option.id, option.is_default))
        .collect();

    after
        .iter()
        .filter_map(|option| {
            let was_default = *original.get(&option.id)?;
            (was_default != option.is_default).then_some(FlagChange {
                card_option_id: option.id,
                user_id: option.user_id,
                was_default,
                is_default: option.is_default,
            })
        })
        .collect()
}
