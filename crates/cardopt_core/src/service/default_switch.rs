//! Default-switch use case.
//!
//! # Responsibility
//! - Check that a user's card options hold exactly one default and exactly
//!   one non-default row.
//! - Move the default flag between those two rows as one atomic write.
//!
//! # Invariants
//! - A successful switch writes exactly two rows.
//! - The old default is cleared before the new one is set, so the partial
//!   unique index never sees two defaults for one user.
//! - Writes are conditional on the flags observed at read time; a snapshot
//!   that no longer matches storage fails with `StaleSnapshot`.
//! - Switching twice restores the original assignment.

use crate::db::DbError;
use crate::model::card_option::{CardOption, CardOptionId};
use crate::model::user::UserId;
use crate::repo::card_option_repo::{CardOptionListQuery, CardOptionRepository};
use crate::repo::error::RepoError;
use crate::tracking::{diff_flags, FlagChange};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Rows written by every successful switch.
const SWITCH_WRITE_COUNT: usize = 2;

/// Why a row set cannot be switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// No row is flagged as default.
    NoDefault,
    /// More than one row is flagged as default.
    MultipleDefaults { count: usize },
    /// No non-default row to promote.
    NoCandidate,
    /// More than one non-default row could be promoted.
    MultipleCandidates { count: usize },
    /// Rows belong to more than one user.
    MixedOwners { first: UserId, other: UserId },
    /// The same card option appears more than once.
    DuplicateRow { id: CardOptionId },
}

impl Display for PreconditionViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDefault => write!(f, "no card option is marked default"),
            Self::MultipleDefaults { count } => {
                write!(f, "{count} card options are marked default, expected 1")
            }
            Self::NoCandidate => write!(f, "no non-default card option to promote"),
            Self::MultipleCandidates { count } => {
                write!(f, "{count} non-default card options, expected 1")
            }
            Self::MixedOwners { first, other } => {
                write!(f, "card options belong to users {first} and {other}")
            }
            Self::DuplicateRow { id } => write!(f, "card option {id} is listed more than once"),
        }
    }
}

impl Error for PreconditionViolation {}

/// Errors from default-switch operations.
#[derive(Debug)]
pub enum SwitchError {
    Precondition(PreconditionViolation),
    /// SQLite rejected the commit; nothing was written.
    ConstraintViolation(DbError),
    Connectivity(DbError),
    /// Storage changed since the rows were read; nothing was written.
    StaleSnapshot { card_option_id: CardOptionId },
    /// A switch planned or wrote a row count other than two.
    UnexpectedWriteCount { actual: usize },
    Repo(RepoError),
}

impl Display for SwitchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition(err) => write!(f, "precondition violation: {err}"),
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::Connectivity(err) => write!(f, "store unreachable: {err}"),
            Self::StaleSnapshot { card_option_id } => write!(
                f,
                "card option {card_option_id} changed since it was read; reload and retry"
            ),
            Self::UnexpectedWriteCount { actual } => write!(
                f,
                "default switch touched {actual} rows, expected {SWITCH_WRITE_COUNT}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SwitchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Precondition(err) => Some(err),
            Self::ConstraintViolation(err) | Self::Connectivity(err) => Some(err),
            Self::StaleSnapshot { .. } | Self::UnexpectedWriteCount { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<PreconditionViolation> for SwitchError {
    fn from(value: PreconditionViolation) -> Self {
        Self::Precondition(value)
    }
}

impl From<RepoError> for SwitchError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ConstraintViolation(err) => Self::ConstraintViolation(err),
            RepoError::Connectivity(err) => Self::Connectivity(err),
            RepoError::StaleWrite { card_option_id, .. } => Self::StaleSnapshot { card_option_id },
            other => Self::Repo(other),
        }
    }
}

/// Validated switch ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPlan {
    pub user_id: UserId,
    pub previous_default: CardOption,
    pub new_default: CardOption,
    /// Clear-old first, then set-new.
    pub changes: Vec<FlagChange>,
}

impl SwitchPlan {
    /// Number of rows the plan writes.
    pub fn modified_count(&self) -> usize {
        self.changes.len()
    }
}

/// Result of one committed switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub user_id: UserId,
    pub previous_default: CardOptionId,
    pub new_default: CardOptionId,
    pub modified: usize,
}

/// Checks the switch precondition on `rows` and plans the two writes.
///
/// # Errors
/// - `MixedOwners` when rows of several users are passed together.
/// - `DuplicateRow` when one card option id appears twice.
/// - `NoDefault` / `MultipleDefaults` unless exactly one row is default.
/// - `NoCandidate` / `MultipleCandidates` unless exactly one row is not.
pub fn plan_switch(rows: &[CardOption]) -> Result<SwitchPlan, PreconditionViolation> {
    let user_id = match rows.first() {
        Some(first) => first.user_id,
        None => return Err(PreconditionViolation::NoDefault),
    };
    if let Some(other) = rows.iter().find(|row| row.user_id != user_id) {
        return Err(PreconditionViolation::MixedOwners {
            first: user_id,
            other: other.user_id,
        });
    }
    let mut seen = HashSet::with_capacity(rows.len());
    if let Some(duplicate) = rows.iter().find(|row| !seen.insert(row.id)) {
        return Err(PreconditionViolation::DuplicateRow { id: duplicate.id });
    }

    let previous_default = single(rows, true).map_err(|count| match count {
        0 => PreconditionViolation::NoDefault,
        count => PreconditionViolation::MultipleDefaults { count },
    })?;
    let candidate = single(rows, false).map_err(|count| match count {
        0 => PreconditionViolation::NoCandidate,
        count => PreconditionViolation::MultipleCandidates { count },
    })?;

    let after = rows
        .iter()
        .map(|row| match row.id {
            id if id == previous_default.id => row.with_default(false),
            id if id == candidate.id => row.with_default(true),
            _ => *row,
        })
        .collect::<Vec<_>>();

    let mut changes = diff_flags(rows, &after);
    changes.sort_by_key(|change| change.is_default);

    Ok(SwitchPlan {
        user_id,
        previous_default,
        new_default: candidate.with_default(true),
        changes,
    })
}

/// Returns the only row with `is_default == flag`, or the match count.
fn single(rows: &[CardOption], flag: bool) -> Result<CardOption, usize> {
    let mut matches = rows.iter().filter(|row| row.is_default == flag);
    match (matches.next(), matches.next()) {
        (Some(row), None) => Ok(*row),
        (None, _) => Err(0),
        (Some(_), Some(_)) => Err(2 + matches.count()),
    }
}

/// Default-switch service facade.
pub struct DefaultSwitchService<R: CardOptionRepository> {
    repo: R,
}

impl<R: CardOptionRepository> DefaultSwitchService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Reads the user's card options fresh and switches their default.
    pub fn switch_default(&self, user_id: UserId) -> Result<SwitchOutcome, SwitchError> {
        let rows = self
            .repo
            .list_card_options(&CardOptionListQuery::for_user(user_id))?;
        self.apply_switch(&rows)
    }

    /// Switches the default using rows the caller already holds.
    ///
    /// The write only succeeds when storage still matches `rows` for the two
    /// switched card options.
    pub fn apply_switch(&self, rows: &[CardOption]) -> Result<SwitchOutcome, SwitchError> {
        let started_at = Instant::now();
        let result = self.apply_switch_inner(rows);

        match &result {
            Ok(outcome) => info!(
                "event=default_switch module=service status=ok user_id={} from={} to={} modified={} duration_ms={}",
                outcome.user_id,
                outcome.previous_default,
                outcome.new_default,
                outcome.modified,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=default_switch module=service status=error rows={} duration_ms={} error={}",
                rows.len(),
                started_at.elapsed().as_millis(),
                err
            ),
        }

        result
    }

    fn apply_switch_inner(&self, rows: &[CardOption]) -> Result<SwitchOutcome, SwitchError> {
        let plan = plan_switch(rows)?;
        if plan.modified_count() != SWITCH_WRITE_COUNT {
            return Err(SwitchError::UnexpectedWriteCount {
                actual: plan.modified_count(),
            });
        }
        let modified = self.repo.apply_flag_changes(&plan.changes)?;
        if modified != SWITCH_WRITE_COUNT {
            return Err(SwitchError::UnexpectedWriteCount { actual: modified });
        }

        Ok(SwitchOutcome {
            user_id: plan.user_id,
            previous_default: plan.previous_default.id,
            new_default: plan.new_default.id,
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_switch, PreconditionViolation};
    use crate::model::card_option::CardOption;

    fn option(id: i64, user_id: i64, is_default: bool) -> CardOption {
        CardOption {
            id,
            user_id,
            is_default,
        }
    }

    #[test]
    fn plan_clears_old_default_before_setting_new_one() {
        let rows = [option(1, 10, true), option(2, 10, false)];
        let plan = plan_switch(&rows).unwrap();

        assert_eq!(plan.user_id, 10);
        assert_eq!(plan.previous_default.id, 1);
        assert_eq!(plan.new_default.id, 2);
        assert_eq!(plan.modified_count(), 2);
        assert_eq!(plan.changes[0].card_option_id, 1);
        assert!(!plan.changes[0].is_default);
        assert_eq!(plan.changes[1].card_option_id, 2);
        assert!(plan.changes[1].is_default);
    }

    #[test]
    fn plan_order_does_not_depend_on_row_order() {
        let rows = [option(2, 10, false), option(1, 10, true)];
        let plan = plan_switch(&rows).unwrap();
        assert_eq!(plan.changes[0].card_option_id, 1);
        assert_eq!(plan.changes[1].card_option_id, 2);
    }

    #[test]
    fn empty_rows_have_no_default() {
        assert_eq!(plan_switch(&[]), Err(PreconditionViolation::NoDefault));
    }

    #[test]
    fn zero_or_many_defaults_are_rejected() {
        let none = [option(1, 10, false), option(2, 10, false)];
        assert_eq!(plan_switch(&none), Err(PreconditionViolation::NoDefault));

        let both = [option(1, 10, true), option(2, 10, true)];
        assert_eq!(
            plan_switch(&both),
            Err(PreconditionViolation::MultipleDefaults { count: 2 })
        );
    }

    #[test]
    fn zero_or_many_candidates_are_rejected() {
        let lone = [option(1, 10, true)];
        assert_eq!(plan_switch(&lone), Err(PreconditionViolation::NoCandidate));

        let three = [
            option(1, 10, true),
            option(2, 10, false),
            option(3, 10, false),
        ];
        assert_eq!(
            plan_switch(&three),
            Err(PreconditionViolation::MultipleCandidates { count: 2 })
        );
    }

    #[test]
    fn rows_of_different_users_are_rejected() {
        let rows = [option(1, 10, true), option(2, 11, false)];
        assert_eq!(
            plan_switch(&rows),
            Err(PreconditionViolation::MixedOwners {
                first: 10,
                other: 11
            })
        );
    }

    #[test]
    fn same_row_listed_twice_is_rejected() {
        let row = option(1, 10, true);
        assert_eq!(
            plan_switch(&[row, row.with_default(false)]),
            Err(PreconditionViolation::DuplicateRow { id: 1 })
        );

        let rows = [option(1, 10, true), option(2, 10, false), option(2, 10, false)];
        assert_eq!(
            plan_switch(&rows),
            Err(PreconditionViolation::DuplicateRow { id: 2 })
        );
    }
}
