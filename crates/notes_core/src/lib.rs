//! Core persistence and error contracts for the notes service.
//! This crate owns the entity lifecycle, the store wrapper and the
//! client-facing error model shared by every handler.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{
    insert_returning, is_duplicate, Context, DatabaseError, Db, DbError, DbOptions, DbResult,
    DuplicateCheck, Limit,
};
pub use logging::{
    init_logging, LogOptions, LogRecord, LogSink, Logger, LoggingError, MemorySink,
};
pub use model::{Error, ErrorWrapper, Note, Notes, Storable, Timestamp, User, Users};
pub use repo::{NoteRepository, SqliteNoteRepository, SqliteUserRepository, UserRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
