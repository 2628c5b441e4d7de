//! SQLite storage, transactions and failure classification.
//!
//! # Responsibility
//! - Open, configure and migrate SQLite connections.
//! - Run units of work atomically through [`Db::tx`].
//! - Translate store failures into [`DbError`] sentinels and flat
//!   [`DatabaseError`] wrappers.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A [`DatabaseError`] never wraps another [`DatabaseError`].

mod classify;
mod context;
mod limit;
pub mod migrations;
mod open;
mod pool;

pub use classify::{is_duplicate, DuplicateCheck};
pub use context::Context;
pub use limit::Limit;
pub(crate) use limit::limit_clause;
pub use pool::{insert_returning, Db, DbOptions};

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DbResult<T> = Result<T, DbError>;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum DbError {
    /// Raw failure reported by SQLite.
    Sqlite(rusqlite::Error),
    /// A lookup expected one row but none matched.
    NotFound,
    /// A unique constraint rejected the write.
    Duplicate,
    /// Failure wrapped with a human-readable description.
    Database(DatabaseError),
    /// The owning request was cancelled before or during the unit of work.
    Cancelled,
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NotFound => write!(f, "record not found"),
            Self::Duplicate => write!(f, "duplicate record"),
            Self::Database(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "request cancelled"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<DatabaseError> for DbError {
    fn from(value: DatabaseError) -> Self {
        Self::Database(value)
    }
}

/// Failure encountered while executing a query or mapping its result.
///
/// Carries a message and at most one level of cause.
#[derive(Debug)]
pub struct DatabaseError {
    msg: String,
    cause: Option<BoxError>,
}

impl DatabaseError {
    /// Wraps `cause` with `msg`.
    ///
    /// If `cause` already is a [`DatabaseError`] (directly or as
    /// [`DbError::Database`]), that error is returned unchanged instead.
    pub fn new(msg: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        let cause = match cause.into().downcast::<DatabaseError>() {
            Ok(inner) => return *inner,
            Err(other) => other,
        };
        let cause = match cause.downcast::<DbError>() {
            Ok(inner) => match *inner {
                DbError::Database(inner) => return inner,
                other => Box::new(other) as BoxError,
            },
            Err(other) => other,
        };

        Self {
            msg: msg.into(),
            cause: Some(cause),
        }
    }

    /// Builds an error with no underlying cause.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            cause: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the causal error, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.msg),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl Error for DatabaseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}
