//! Schema versioning for the state database.
//!
//! The version lives in `SQLite`'s `user_version` pragma. Each entry in
//! [`MIGRATIONS`] raises it by one and runs in its own transaction, so a
//! failed step leaves the database at the previous version.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

use super::schema::CREATE_KV_TABLE;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version the database is at after this step.
    pub version: u32,
    /// What the step does.
    pub description: &'static str,
    /// SQL run by the step.
    pub sql: &'static str,
}

/// Every migration, in version order starting at 1.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "key-value store",
    sql: CREATE_KV_TABLE,
}];

/// The version a fully migrated database is at.
#[must_use]
pub fn current_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Bring the schema up to [`current_version`].
///
/// # Errors
///
/// Returns an error if the database was written by a newer release or a
/// migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let found = schema_version(conn)?;
    let target = current_version();

    if found > target {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {found} is newer than supported version {target}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > found) {
        apply(conn, migration)?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)
        .map_err(|e| Error::DatabaseMigration {
            message: format!(
                "migration {} ({}) failed: {e}",
                migration.version, migration.description
            ),
        })?;
    set_schema_version(&tx, migration.version)?;
    tx.commit()?;

    info!(
        version = migration.version,
        description = migration.description,
        "Applied schema migration"
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))?;
    Ok(())
}
