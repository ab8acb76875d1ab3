//! Repository error taxonomy.

use crate::db::DbError;
use crate::model::card_option::CardOptionId;
use crate::model::user::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from user/card option persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error not covered by another variant.
    Db(DbError),
    /// SQLite rejected the write: partial unique index, foreign key or check.
    ConstraintViolation(DbError),
    /// Store could not be opened, or stayed locked past the busy timeout.
    Connectivity(DbError),
    UserNotFound(UserId),
    CardOptionNotFound(CardOptionId),
    /// Stored flag differs from the value the writer expected.
    StaleWrite {
        card_option_id: CardOptionId,
        expected_default: bool,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::Connectivity(err) => write!(f, "store unreachable: {err}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::CardOptionNotFound(id) => write!(f, "card option not found: {id}"),
            Self::StaleWrite {
                card_option_id,
                expected_default,
            } => write!(
                f,
                "card option {card_option_id} no longer has is_default={expected_default}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) | Self::ConstraintViolation(err) | Self::Connectivity(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_constraint_violation() {
            Self::ConstraintViolation(value)
        } else if value.is_connectivity_failure() {
            Self::Connectivity(value)
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}
