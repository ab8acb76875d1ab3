//! Card option repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read APIs over `CardOption` storage.
//! - Apply default-flag change sets atomically.
//!
//! # Invariants
//! - Listing is deterministic: `Id ASC`.
//! - Flag writes are conditional on the stored flag matching
//!   `FlagChange::was_default`; a mismatch aborts the whole change set.
//! - A change set commits entirely or not at all. The partial unique index
//!   is checked per statement, so a write order that briefly produces two
//!   defaults rolls the transaction back.

use crate::model::card_option::{CardOption, CardOptionId};
use crate::model::user::{User, UserId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::guard::ensure_table_ready;
use crate::tracking::FlagChange;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};

const CARD_OPTION_SELECT_SQL: &str = "SELECT
    Id,
    UserId,
    IsDefault
FROM CardOption";

/// Query options for listing card options.
#[derive(Debug, Clone, Default)]
pub struct CardOptionListQuery {
    /// Restrict to one owner. `None` lists every owner's rows.
    pub user_id: Option<UserId>,
    pub defaults_only: bool,
}

impl CardOptionListQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

/// Repository interface for card option persistence.
pub trait CardOptionRepository {
    /// Inserts one card option for an existing user.
    fn create_card_option(&self, user_id: UserId, is_default: bool) -> RepoResult<CardOption>;
    /// Inserts a new user and its card options in one transaction.
    fn create_owner(&self, defaults: &[bool]) -> RepoResult<(User, Vec<CardOption>)>;
    fn get_card_option(&self, id: CardOptionId) -> RepoResult<Option<CardOption>>;
    fn list_card_options(&self, query: &CardOptionListQuery) -> RepoResult<Vec<CardOption>>;
    /// Counts committed default rows for one user.
    fn count_defaults(&self, user_id: UserId) -> RepoResult<u32>;
    /// Lists users holding more than one default row.
    fn owners_with_multiple_defaults(&self) -> RepoResult<Vec<UserId>>;
    /// Applies flag changes in order inside one transaction.
    ///
    /// Returns the number of rows written.
    fn apply_flag_changes(&self, changes: &[FlagChange]) -> RepoResult<usize>;
}

/// SQLite-backed card option repository.
pub struct SqliteCardOptionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCardOptionRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "CardOption", &["Id", "UserId", "IsDefault"])?;
        Ok(Self { conn })
    }
}

impl CardOptionRepository for SqliteCardOptionRepository<'_> {
    fn create_card_option(&self, user_id: UserId, is_default: bool) -> RepoResult<CardOption> {
        insert_card_option(self.conn, user_id, is_default)
    }

    fn create_owner(&self, defaults: &[bool]) -> RepoResult<(User, Vec<CardOption>)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("INSERT INTO User DEFAULT VALUES;", [])?;
        let user = User {
            id: tx.last_insert_rowid(),
        };

        let mut options = Vec::with_capacity(defaults.len());
        for &is_default in defaults {
            options.push(insert_card_option(&tx, user.id, is_default)?);
        }
        tx.commit()?;

        Ok((user, options))
    }

    fn get_card_option(&self, id: CardOptionId) -> RepoResult<Option<CardOption>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_OPTION_SELECT_SQL} WHERE Id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_card_option_row(row)?));
        }
        Ok(None)
    }

    fn list_card_options(&self, query: &CardOptionListQuery) -> RepoResult<Vec<CardOption>> {
        let mut sql = format!("{CARD_OPTION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(user_id) = query.user_id {
            sql.push_str(" AND UserId = ?");
            bind_values.push(Value::Integer(user_id));
        }
        if query.defaults_only {
            sql.push_str(" AND IsDefault = 1");
        }
        sql.push_str(" ORDER BY Id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut options = Vec::new();
        while let Some(row) = rows.next()? {
            options.push(parse_card_option_row(row)?);
        }
        Ok(options)
    }

    fn count_defaults(&self, user_id: UserId) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM CardOption WHERE UserId = ?1 AND IsDefault = 1;",
            [user_id],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    fn owners_with_multiple_defaults(&self) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT UserId
             FROM CardOption
             WHERE IsDefault = 1
             GROUP BY UserId
             HAVING COUNT(*) > 1
             ORDER BY UserId ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut owners = Vec::new();
        while let Some(row) = rows.next()? {
            owners.push(row.get(0)?);
        }
        Ok(owners)
    }

    fn apply_flag_changes(&self, changes: &[FlagChange]) -> RepoResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        // Dropping `tx` on any early return rolls back earlier writes.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for change in changes {
            let changed = tx.execute(
                "UPDATE CardOption
                 SET IsDefault = ?1
                 WHERE Id = ?2
                   AND UserId = ?3
                   AND IsDefault = ?4;",
                params![
                    bool_to_int(change.is_default),
                    change.card_option_id,
                    change.user_id,
                    bool_to_int(change.was_default),
                ],
            )?;

            if changed == 0 {
                return Err(explain_missed_write(&tx, change)?);
            }
        }
        tx.commit()?;

        Ok(changes.len())
    }
}

fn insert_card_option(
    conn: &Connection,
    user_id: UserId,
    is_default: bool,
) -> RepoResult<CardOption> {
    conn.execute(
        "INSERT INTO CardOption (UserId, IsDefault) VALUES (?1, ?2);",
        params![user_id, bool_to_int(is_default)],
    )?;
    Ok(CardOption {
        id: conn.last_insert_rowid(),
        user_id,
        is_default,
    })
}

/// Maps a zero-row conditional update to the reason it missed.
fn explain_missed_write(conn: &Connection, change: &FlagChange) -> RepoResult<RepoError> {
    let owner = conn
        .query_row(
            "SELECT UserId FROM CardOption WHERE Id = ?1;",
            [change.card_option_id],
            |row| row.get::<_, UserId>(0),
        )
        .optional()?;

    Ok(match owner {
        Some(user_id) if user_id == change.user_id => RepoError::StaleWrite {
            card_option_id: change.card_option_id,
            expected_default: change.was_default,
        },
        Some(user_id) => RepoError::InvalidData(format!(
            "card option {} belongs to user {user_id}, not {}",
            change.card_option_id, change.user_id
        )),
        None => RepoError::CardOptionNotFound(change.card_option_id),
    })
}

fn parse_card_option_row(row: &Row<'_>) -> RepoResult<CardOption> {
    let is_default = match row.get::<_, i64>("IsDefault")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid IsDefault value `{other}` in CardOption.IsDefault"
            )));
        }
    };

    Ok(CardOption {
        id: row.get("Id")?,
        user_id: row.get("UserId")?,
        is_default,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
