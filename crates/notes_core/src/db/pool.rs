//! Shared store handle: connection pool and units of work.
//!
//! # Responsibility
//! - Hand out one connection per unit of work and take it back afterwards.
//! - Run caller functions inside a transaction with commit/rollback
//!   guarantees, including when the function panics or the request is
//!   cancelled.
//! - Provide the single-row `INSERT ... RETURNING` primitive.
//!
//! # Invariants
//! - A connection is returned to the pool only outside of a transaction.
//! - Rollback happens before a panic from a unit of work is resumed.
//! - A unit of work whose context is cancelled never commits.
//! - In-memory stores live on one connection; units of work against them
//!   run one at a time and must not nest.

use super::context::Context;
use super::open::{open_and_migrate, open_connection, Target};
use super::{DatabaseError, DbError, DbResult};
use crate::logging::Logger;
use rusqlite::{Connection, Params, Row, Transaction, TransactionBehavior};
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DEFAULT_MAX_IDLE: usize = 8;
/// SQLite VM instructions between two cancellation checks.
const CANCEL_CHECK_OPS: i32 = 100;

/// Tuning knobs for [`Db`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    /// Connections kept open between units of work. Ignored for `:memory:`.
    pub max_idle: usize,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

/// Cheaply cloneable handle to the store, shared by all repositories.
#[derive(Clone)]
pub struct Db {
    inner: Arc<Inner>,
}

struct Inner {
    target: Target,
    idle: Mutex<Vec<Connection>>,
    options: DbOptions,
    log: Logger,
    /// The only connection of an in-memory store.
    shared: Option<Mutex<Connection>>,
}

impl Db {
    /// Opens the store named by `dsn` (`:memory:` or a file path) and applies
    /// pending migrations.
    pub fn open(dsn: &str, log: &Logger) -> DbResult<Self> {
        Self::open_with(dsn, DbOptions::default(), log)
    }

    /// Opens a private in-memory store; used by tests and tooling.
    pub fn open_in_memory(log: &Logger) -> DbResult<Self> {
        Self::open(super::open::MEMORY_DSN, log)
    }

    pub fn open_with(dsn: &str, options: DbOptions, log: &Logger) -> DbResult<Self> {
        let log = log.with("module", "db");
        let target = Target::from_dsn(dsn);
        let first = open_and_migrate(&target, &log)?;

        let (shared, idle) = match target {
            Target::Memory => (Some(Mutex::new(first)), Vec::new()),
            Target::File(_) => (None, vec![first]),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                target,
                idle: Mutex::new(idle),
                options,
                log,
                shared,
            }),
        })
    }

    /// Runs `f` inside one transaction.
    ///
    /// - `Ok` from `f` commits; a failed commit is returned as the result.
    /// - `Err` from `f` rolls back and is returned unchanged.
    /// - A panic in `f` rolls back, then resumes with the same payload.
    /// - Cancelling `ctx` makes running statements fail, and an `Ok` from
    ///   `f` rolls back with [`DbError::Cancelled`] instead of committing.
    ///
    /// # Errors
    /// Returns `E::from(DbError)` when the context is cancelled, no
    /// connection can be checked out, or the transaction cannot begin/commit.
    pub fn tx<T, E, F>(&self, ctx: &Context, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.checkout(ctx)?;
        let _attached = ctx.attach(conn.get_interrupt_handle());

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;

        match panic::catch_unwind(AssertUnwindSafe(|| f(&tx))) {
            Ok(Ok(_)) if ctx.is_cancelled() => {
                self.rollback(ctx, tx);
                self.inner.log.warn(
                    "tx_cancelled",
                    &[("status", &"error"), ("request_id", &ctx.request_id())],
                );
                Err(DbError::Cancelled.into())
            }
            Ok(Ok(value)) => {
                tx.commit().map_err(|err| self.interrupted_or(ctx, err))?;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback(ctx, tx);
                Err(err)
            }
            Err(payload) => {
                self.rollback(ctx, tx);
                self.inner.log.error(
                    "tx_panic",
                    &[("status", &"error"), ("request_id", &ctx.request_id())],
                );
                panic::resume_unwind(payload)
            }
        }
    }

    /// Runs `f` with a pooled connection outside of an explicit transaction.
    ///
    /// # Errors
    /// Same checkout failures as [`Db::tx`], plus whatever `f` returns.
    pub fn read<T, E, F>(&self, ctx: &Context, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.checkout(ctx)?;
        let _attached = ctx.attach(conn.get_interrupt_handle());
        f(&conn)
    }

    /// Executes one `INSERT ... RETURNING` statement as its own unit of work
    /// and maps the single returned row with `map`.
    ///
    /// # Errors
    /// See [`insert_returning`] and [`Db::tx`].
    pub fn insert<P, T, F>(&self, ctx: &Context, sql: &str, params: P, map: F) -> DbResult<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.tx(ctx, |tx| insert_returning(tx, sql, params, map))
    }

    fn checkout(&self, ctx: &Context) -> DbResult<Pooled<'_>> {
        if ctx.is_cancelled() {
            return Err(DbError::Cancelled);
        }

        let slot = match &self.inner.shared {
            // Units of work roll back before unwinding, so a connection
            // behind a poisoned lock is still consistent.
            Some(shared) => {
                Slot::Shared(shared.lock().unwrap_or_else(PoisonError::into_inner))
            }
            None => {
                let reused = self
                    .inner
                    .idle
                    .lock()
                    .map_err(|_| DatabaseError::msg("connection pool lock poisoned"))?
                    .pop();
                match reused {
                    Some(conn) => Slot::Owned(Some(conn)),
                    None => Slot::Owned(Some(open_connection(&self.inner.target)?)),
                }
            }
        };

        let pooled = Pooled {
            db: &self.inner,
            slot,
        };
        let watched = ctx.clone();
        pooled.progress_handler(CANCEL_CHECK_OPS, Some(move || watched.is_cancelled()));
        Ok(pooled)
    }

    fn rollback(&self, ctx: &Context, tx: Transaction<'_>) {
        if let Err(err) = tx.rollback() {
            self.inner.log.warn(
                "tx_rollback",
                &[
                    ("status", &"error"),
                    ("request_id", &ctx.request_id()),
                    ("error", &err),
                ],
            );
        }
    }

    fn interrupted_or(&self, ctx: &Context, err: rusqlite::Error) -> DbError {
        if ctx.is_cancelled() {
            DbError::Cancelled
        } else {
            DbError::Sqlite(err)
        }
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("target", &self.inner.target)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Executes an `INSERT ... RETURNING` statement that must yield exactly one
/// row and maps it with `map`.
///
/// # Errors
/// - The raw SQLite error when the statement fails (including constraint
///   violations, so callers can classify them).
/// - `QueryReturnedNoRows` when nothing was returned.
/// - A [`DatabaseError`] when more than one row was returned.
pub fn insert_returning<P, T, F>(conn: &Connection, sql: &str, params: P, map: F) -> DbResult<T>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    let value = match rows.next()? {
        Some(row) => map(row)?,
        None => return Err(rusqlite::Error::QueryReturnedNoRows.into()),
    };

    if rows.next()?.is_some() {
        return Err(DatabaseError::msg("insert returned more than one row").into());
    }

    Ok(value)
}

/// Connection checked out of [`Db`]; goes back to the idle list on drop.
struct Pooled<'a> {
    db: &'a Inner,
    slot: Slot<'a>,
}

enum Slot<'a> {
    Owned(Option<Connection>),
    Shared(MutexGuard<'a, Connection>),
}

impl Deref for Pooled<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match &self.slot {
            Slot::Owned(conn) => conn.as_ref().expect("pooled connection present until drop"),
            Slot::Shared(conn) => &**conn,
        }
    }
}

impl DerefMut for Pooled<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        match &mut self.slot {
            Slot::Owned(conn) => conn.as_mut().expect("pooled connection present until drop"),
            Slot::Shared(conn) => &mut **conn,
        }
    }
}

impl Drop for Pooled<'_> {
    fn drop(&mut self) {
        self.progress_handler(0, None::<fn() -> bool>);

        let Slot::Owned(conn) = &mut self.slot else {
            return;
        };
        let Some(conn) = conn.take() else {
            return;
        };
        if !conn.is_autocommit() {
            return;
        }
        if let Ok(mut idle) = self.db.idle.lock() {
            if idle.len() < self.db.options.max_idle {
                idle.push(conn);
            }
        }
    }
}
