//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Resolve a connection string into a file or private in-memory target.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations when the store is first opened.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Migrations run once per [`super::Db`], before any connection is pooled.

use super::migrations::migrate;
use super::DbResult;
use crate::logging::Logger;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub(crate) const MEMORY_DSN: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where connections of one [`super::Db`] point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    File(PathBuf),
    /// One private in-memory database, reached only through a single connection.
    Memory,
}

impl Target {
    pub(crate) fn from_dsn(dsn: &str) -> Self {
        let trimmed = dsn.trim();
        if trimmed == MEMORY_DSN {
            return Self::Memory;
        }
        Self::File(PathBuf::from(trimmed))
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens and configures one connection to `target` without migrating.
pub(crate) fn open_connection(target: &Target) -> DbResult<Connection> {
    let conn = match target {
        Target::File(path) => Connection::open(path)?,
        Target::Memory => Connection::open_in_memory()?,
    };
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Opens the first connection to `target` and applies pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub(crate) fn open_and_migrate(target: &Target, log: &Logger) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();
    log.info("db_open", &[("status", &"start"), ("mode", &mode)]);

    let result = open_connection(target).and_then(|mut conn| {
        migrate(&mut conn, log)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => log.info(
            "db_open",
            &[
                ("status", &"ok"),
                ("mode", &mode),
                ("duration_ms", &started_at.elapsed().as_millis()),
            ],
        ),
        Err(err) => log.error(
            "db_open",
            &[
                ("status", &"error"),
                ("mode", &mode),
                ("duration_ms", &started_at.elapsed().as_millis()),
                ("error", err),
            ],
        ),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::{Target, MEMORY_DSN};
    use std::path::PathBuf;

    #[test]
    fn memory_dsn_is_recognized_with_surrounding_whitespace() {
        assert_eq!(Target::from_dsn(MEMORY_DSN), Target::Memory);
        assert_eq!(Target::from_dsn(" :memory: "), Target::Memory);
        assert_eq!(Target::Memory.mode(), "memory");
    }

    #[test]
    fn other_dsn_values_are_file_paths() {
        assert_eq!(
            Target::from_dsn("/var/lib/notes/notes.db"),
            Target::File(PathBuf::from("/var/lib/notes/notes.db"))
        );
    }
}
