//! Schema migrations tracked through `PRAGMA user_version`.
//!
//! Step `n` of [`STEPS`] moves the schema from version `n - 1` to `n`. Steps
//! are only ever appended.

use crate::db::{DbError, DbResult};
use crate::logging::Logger;
use rusqlite::{Connection, TransactionBehavior};

const STEPS: &[&str] = &[include_str!("0001_init.sql")];

/// Schema version this build migrates to.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Brings `conn` up to [`latest_version`] and returns the resulting version.
///
/// Pending steps run in one immediate transaction. A store already at the
/// latest version is left untouched and nothing is logged.
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store is newer than this build.
/// - [`DbError::Sqlite`] when a step fails; no step is kept in that case.
pub(crate) fn migrate(conn: &mut Connection, log: &Logger) -> DbResult<u32> {
    let latest = latest_version();
    let from = schema_version(conn)?;

    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        return Ok(from);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for (version, sql) in (1u32..).zip(STEPS).skip(from as usize) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    log.info(
        "db_migrate",
        &[("status", &"ok"), ("from", &from), ("to", &latest)],
    );
    Ok(latest)
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
