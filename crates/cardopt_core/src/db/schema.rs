//! Schema lifecycle helpers used by fixtures and the `reset` CLI command.
//!
//! # Invariants
//! - `ensure_deleted` leaves `user_version = 0` and no cardopt tables.
//! - Drops run in one transaction, dependents before owners.

use super::migrations::apply_migrations;
use super::DbResult;
use log::info;
use rusqlite::Connection;

const DROP_SCHEMA_SQL: &str = "
    DROP INDEX IF EXISTS IX_CardOption_UserId;
    DROP INDEX IF EXISTS IX_CardOption_Owner;
    DROP TABLE IF EXISTS CardOption;
    DROP TABLE IF EXISTS User;
    PRAGMA user_version = 0;
";

/// Drops every cardopt schema object. Returns whether a schema was present.
pub fn ensure_deleted(conn: &mut Connection) -> DbResult<bool> {
    let existed: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name IN ('User', 'CardOption')
        );",
        [],
        |row| row.get(0),
    )?;

    let tx = conn.transaction()?;
    tx.execute_batch(DROP_SCHEMA_SQL)?;
    tx.commit()?;

    info!(
        "event=schema_drop module=db status=ok existed={}",
        existed == 1
    );
    Ok(existed == 1)
}

/// Applies pending migrations; a no-op on an up-to-date schema.
pub fn ensure_created(conn: &mut Connection) -> DbResult<()> {
    apply_migrations(conn)
}

/// Drops and recreates the schema, discarding all rows.
pub fn recreate_schema(conn: &mut Connection) -> DbResult<()> {
    ensure_deleted(conn)?;
    ensure_created(conn)
}
