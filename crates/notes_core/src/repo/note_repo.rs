//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/soft-delete APIs over the `notes` table.
//!
//! # Invariants
//! - Notes are never physically deleted; `delete` only sets `deleted_at`.
//! - Listing excludes soft-deleted notes and returns newest first.
//! - In-memory notes are only mutated after the store accepted the write.

use crate::db::{limit_clause, Context, DatabaseError, Db, DbError, DbResult, Limit};
use crate::model::{Note, Notes, Timestamp};
use rusqlite::{params, OptionalExtension, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    body,
    created_at,
    updated_at,
    deleted_at
FROM notes";

/// Repository interface for note persistence.
pub trait NoteRepository {
    /// Inserts `note`, setting its `id` and timestamps.
    fn create(&self, ctx: &Context, note: &mut Note) -> DbResult<()>;
    /// Gets one note by id, including soft-deleted ones.
    fn get_by_id(&self, ctx: &Context, id: i64) -> DbResult<Note>;
    /// Lists live notes of one user, newest first.
    fn list_by_user(&self, ctx: &Context, user_id: i64, limit: Limit) -> DbResult<Notes>;
    /// Persists `title`/`body`, refreshing `updated_at` and undeleting.
    fn update(&self, ctx: &Context, note: &mut Note) -> DbResult<()>;
    /// Soft-deletes `note`.
    fn delete(&self, ctx: &Context, note: &mut Note) -> DbResult<()>;
}

/// SQLite-backed note repository.
#[derive(Debug, Clone)]
pub struct SqliteNoteRepository {
    db: Db,
}

impl SqliteNoteRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn create(&self, ctx: &Context, note: &mut Note) -> DbResult<()> {
        let mut timestamp = note.timestamp.clone();
        timestamp.created();

        let inserted = self.db.insert(
            ctx,
            "INSERT INTO notes (
                user_id,
                title,
                body,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id;",
            params![
                note.user_id,
                note.title.as_deref(),
                note.body.as_str(),
                timestamp.created_at,
                timestamp.updated_at,
            ],
            |row| row.get::<_, i64>(0),
        );

        match inserted {
            Ok(id) => {
                note.id = id;
                note.timestamp = timestamp;
                Ok(())
            }
            Err(err) => Err(DatabaseError::new("could not create note", err).into()),
        }
    }

    fn get_by_id(&self, ctx: &Context, id: i64) -> DbResult<Note> {
        let found = self.db.read(ctx, |conn| {
            conn.query_row(
                &format!("{NOTE_SELECT_SQL} WHERE id = ?1 LIMIT 1;"),
                [id],
                parse_note_row,
            )
            .optional()
            .map_err(DbError::from)
        });

        match found {
            Ok(Some(note)) => Ok(note),
            Ok(None) => Err(DbError::NotFound),
            Err(err) => Err(DatabaseError::new("could not get note", err).into()),
        }
    }

    fn list_by_user(&self, ctx: &Context, user_id: i64, limit: Limit) -> DbResult<Notes> {
        let listed = self.db.read(ctx, |conn| {
            let mut stmt = conn.prepare(&format!(
                "{NOTE_SELECT_SQL}
                 WHERE user_id = ?1
                   AND deleted_at IS NULL
                 ORDER BY created_at DESC, id DESC
                 {};",
                limit_clause(2)
            ))?;
            let notes = stmt
                .query_map(params![user_id, limit], parse_note_row)?
                .collect::<rusqlite::Result<Notes>>()?;
            Ok::<_, DbError>(notes)
        });

        listed.map_err(|err| DatabaseError::new("could not list notes", err).into())
    }

    fn update(&self, ctx: &Context, note: &mut Note) -> DbResult<()> {
        let mut timestamp = note.timestamp.clone();
        timestamp.updated();

        let changed = self.db.tx(ctx, |tx| {
            tx.execute(
                "UPDATE notes
                 SET
                    title = ?2,
                    body = ?3,
                    updated_at = ?4,
                    deleted_at = NULL
                 WHERE id = ?1;",
                params![
                    note.id,
                    note.title.as_deref(),
                    note.body.as_str(),
                    timestamp.updated_at,
                ],
            )
            .map_err(DbError::from)
        });

        match changed {
            Ok(0) => Err(DbError::NotFound),
            Ok(_) => {
                note.timestamp = timestamp;
                Ok(())
            }
            Err(err) => Err(DatabaseError::new("could not update note", err).into()),
        }
    }

    fn delete(&self, ctx: &Context, note: &mut Note) -> DbResult<()> {
        let mut timestamp = note.timestamp.clone();
        timestamp.deleted();

        let changed = self.db.tx(ctx, |tx| {
            tx.execute(
                "UPDATE notes SET deleted_at = ?2 WHERE id = ?1;",
                params![note.id, timestamp.deleted_at],
            )
            .map_err(DbError::from)
        });

        match changed {
            Ok(0) => Err(DbError::NotFound),
            Ok(_) => {
                note.timestamp = timestamp;
                Ok(())
            }
            Err(err) => Err(DatabaseError::new("could not delete note", err).into()),
        }
    }
}

fn parse_note_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        timestamp: Timestamp {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        },
    })
}
