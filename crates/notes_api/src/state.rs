//! Shared application state handed to every handler.

use crate::response::Api;
use notes_core::{Context, Db, Logger, SqliteNoteRepository, SqliteUserRepository};
use uuid::Uuid;

/// Repositories and logging shared across requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub(crate) users: SqliteUserRepository,
    pub(crate) notes: SqliteNoteRepository,
    log: Logger,
}

impl AppState {
    pub fn new(db: Db, log: &Logger) -> Self {
        Self {
            users: SqliteUserRepository::new(db.clone()),
            notes: SqliteNoteRepository::new(db),
            log: log.with("service", "notes"),
        }
    }

    /// Starts a request: fresh context plus a response builder whose
    /// records carry the request id.
    pub(crate) fn begin(&self) -> (Context, Api) {
        let ctx = Context::new(Uuid::new_v4().to_string());
        let api = Api::new(self.log.with("request_id", ctx.request_id()));
        (ctx, api)
    }
}
