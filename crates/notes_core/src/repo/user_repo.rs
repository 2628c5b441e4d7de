//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Insert users and look them up by any of their unique keys.
//! - Report expected outcomes as sentinels (`NotFound`, `Duplicate`) and
//!   everything else as a wrapped [`DatabaseError`].
//!
//! # Invariants
//! - Unset lookup keys are bound as SQL `NULL`, which never compares equal
//!   to anything, so they cannot match rows whose column is also `NULL`.
//! - `id` and timestamps are written back only after a successful insert.

use crate::db::{is_duplicate, Context, DatabaseError, Db, DbError, DbResult};
use crate::model::{Timestamp, User};
use rusqlite::{params, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    password,
    created_at,
    updated_at,
    deleted_at
FROM users";

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Inserts `user`, setting its `id` and timestamps.
    fn create(&self, ctx: &Context, user: &mut User) -> DbResult<()>;
    fn get_by_id(&self, ctx: &Context, id: i64) -> DbResult<User>;
    fn get_by_username(&self, ctx: &Context, username: &str) -> DbResult<User>;
    fn get_by_email(&self, ctx: &Context, email: &str) -> DbResult<User>;
}

/// SQLite-backed user repository.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    db: Db,
}

impl SqliteUserRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns the first user matching any of the given keys.
    fn get(
        &self,
        ctx: &Context,
        id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<User> {
        let found = self.db.read(ctx, |conn| {
            conn.query_row(
                &format!(
                    "{USER_SELECT_SQL}
                     WHERE id = ?1
                        OR username = ?2
                        OR email = ?3
                     LIMIT 1;"
                ),
                params![id, username, email],
                parse_user_row,
            )
            .optional()
            .map_err(DbError::from)
        });

        match found {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(DbError::NotFound),
            Err(err) => Err(DatabaseError::new("could not get user", err).into()),
        }
    }
}

impl UserRepository for SqliteUserRepository {
    fn create(&self, ctx: &Context, user: &mut User) -> DbResult<()> {
        let mut timestamp = user.timestamp.clone();
        timestamp.created();

        let inserted = self.db.insert(
            ctx,
            "INSERT INTO users (
                username,
                email,
                password,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id;",
            params![
                user.username.as_str(),
                user.email.as_str(),
                user.password.as_slice(),
                timestamp.created_at,
                timestamp.updated_at,
            ],
            |row| row.get::<_, i64>(0),
        );

        match inserted {
            Ok(id) => {
                user.id = id;
                user.timestamp = timestamp;
                Ok(())
            }
            Err(err) if is_duplicate(&err).is_duplicate => Err(DbError::Duplicate),
            Err(err) => Err(DatabaseError::new("could not create user", err).into()),
        }
    }

    fn get_by_id(&self, ctx: &Context, id: i64) -> DbResult<User> {
        self.get(ctx, Some(id), None, None)
    }

    fn get_by_username(&self, ctx: &Context, username: &str) -> DbResult<User> {
        self.get(ctx, None, Some(username), None)
    }

    fn get_by_email(&self, ctx: &Context, email: &str) -> DbResult<User> {
        self.get(ctx, None, None, Some(email))
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password: row.get("password")?,
        timestamp: Timestamp {
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        },
    })
}
