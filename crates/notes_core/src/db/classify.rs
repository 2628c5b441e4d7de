//! Classification of raw store failures.
//!
//! SQLite reports unique violations as `SQLITE_CONSTRAINT_UNIQUE` (or
//! `SQLITE_CONSTRAINT_PRIMARYKEY`) with a message such as
//! `UNIQUE constraint failed: users.username`. Constraint names follow the
//! `<table>_<column>[_<column>]_key` convention, `<table>_pkey` for keys.

use super::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::ffi;
use std::error::Error;

static CONSTRAINT_FAILED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:UNIQUE|PRIMARY KEY) constraint failed: (.+)$")
        .expect("valid constraint regex")
});

/// Outcome of [`is_duplicate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateCheck {
    /// Name of the violated constraint, empty when not a duplicate.
    pub constraint: String,
    pub is_duplicate: bool,
}

/// Reports whether `err` is a unique constraint violation and names the
/// violated constraint.
///
/// Accepts a raw `rusqlite::Error` or a [`DbError::Sqlite`]. Never fails:
/// anything unrecognized classifies as "not a duplicate".
pub fn is_duplicate(err: &(dyn Error + 'static)) -> DuplicateCheck {
    let sqlite_err = match err.downcast_ref::<rusqlite::Error>() {
        Some(err) => err,
        None => match err.downcast_ref::<DbError>() {
            Some(DbError::Sqlite(err)) => err,
            _ => return DuplicateCheck::default(),
        },
    };

    let rusqlite::Error::SqliteFailure(failure, message) = sqlite_err else {
        return DuplicateCheck::default();
    };
    if failure.code != rusqlite::ErrorCode::ConstraintViolation {
        return DuplicateCheck::default();
    }

    let primary_key = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE => false,
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY => true,
        _ => return DuplicateCheck::default(),
    };

    DuplicateCheck {
        constraint: message
            .as_deref()
            .map(|message| constraint_name(message, primary_key))
            .unwrap_or_default(),
        is_duplicate: true,
    }
}

fn constraint_name(message: &str, primary_key: bool) -> String {
    let Some(columns) = CONSTRAINT_FAILED_RE
        .captures(message.trim())
        .and_then(|caps| caps.get(1))
    else {
        return String::new();
    };

    let mut table = "";
    let mut names = Vec::new();
    for qualified in columns.as_str().split(',') {
        let (owner, column) = qualified.trim().split_once('.').unwrap_or(("", qualified.trim()));
        table = owner;
        names.push(column);
    }

    if primary_key {
        format!("{table}_pkey")
    } else {
        format!("{table}_{}_key", names.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::is_duplicate;
    use crate::db::DbError;
    use rusqlite::ffi;

    fn constraint_error(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), Some(message.to_string()))
    }

    #[test]
    fn unique_violation_is_classified_with_constraint_name() {
        let err = constraint_error(
            ffi::SQLITE_CONSTRAINT_UNIQUE,
            "UNIQUE constraint failed: users.username",
        );

        let check = is_duplicate(&err);
        assert!(check.is_duplicate);
        assert_eq!(check.constraint, "users_username_key");
    }

    #[test]
    fn composite_unique_violation_joins_columns() {
        let err = DbError::Sqlite(constraint_error(
            ffi::SQLITE_CONSTRAINT_UNIQUE,
            "UNIQUE constraint failed: notes.user_id, notes.title",
        ));

        let check = is_duplicate(&err);
        assert!(check.is_duplicate);
        assert_eq!(check.constraint, "notes_user_id_title_key");
    }

    #[test]
    fn primary_key_violation_uses_pkey_name() {
        let err = constraint_error(
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
            "UNIQUE constraint failed: users.id",
        );

        assert_eq!(is_duplicate(&err).constraint, "users_pkey");
    }

    #[test]
    fn other_constraint_violations_are_not_duplicates() {
        let err = constraint_error(
            ffi::SQLITE_CONSTRAINT_NOTNULL,
            "NOT NULL constraint failed: users.email",
        );

        assert!(!is_duplicate(&err).is_duplicate);
    }

    #[test]
    fn unrelated_errors_are_not_duplicates() {
        assert!(!is_duplicate(&rusqlite::Error::QueryReturnedNoRows).is_duplicate);
        assert!(!is_duplicate(&DbError::NotFound).is_duplicate);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let check = is_duplicate(&io);
        assert!(!check.is_duplicate);
        assert!(check.constraint.is_empty());
    }
}
