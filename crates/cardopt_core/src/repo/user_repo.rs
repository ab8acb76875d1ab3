//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - User ids are assigned by SQLite and never reused (`AUTOINCREMENT`).
//! - Deleting a user that still owns card options is rejected by the
//!   foreign key and surfaces as `RepoError::ConstraintViolation`.

use crate::model::user::{User, UserId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::guard::ensure_table_ready;
use rusqlite::{Connection, OptionalExtension};

/// Repository interface for owner rows.
pub trait UserRepository {
    fn create_user(&self) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "User", &["Id"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self) -> RepoResult<User> {
        self.conn.execute("INSERT INTO User DEFAULT VALUES;", [])?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row("SELECT Id FROM User WHERE Id = ?1;", [id], |row| {
                Ok(User { id: row.get(0)? })
            })
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare("SELECT Id FROM User ORDER BY Id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(User { id: row.get(0)? });
        }
        Ok(users)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM User WHERE Id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::UserNotFound(id));
        }
        Ok(())
    }
}
