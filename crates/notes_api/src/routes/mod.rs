//! Route table and helpers shared by the handlers.
//!
//! # Invariants
//! - Handlers always answer through [`Api::ok`] or [`Api::fail`].
//! - Store calls run on the blocking pool under the request's [`Context`],
//!   which is cancelled if the request future is dropped first.

mod notes;
mod users;

use crate::response::{Api, Failure, Reply};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use notes_core::{Context, DbError, Error};
use serde::de::DeserializeOwned;

/// Builds the HTTP router for the notes service.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(users::create))
        .route("/users/:id", get(users::get))
        .route("/users/:id/notes", post(notes::create).get(notes::list))
        .route(
            "/notes/:id",
            get(notes::get).put(notes::update).delete(notes::delete),
        )
        .fallback(unknown_route)
        .with_state(state)
}

async fn unknown_route(State(state): State<AppState>) -> Response {
    let (_, api) = state.begin();
    api.fail(Error::new("not_found", "route not found", 404))
}

/// Runs `work` on the blocking pool with the request context.
pub(crate) async fn run_blocking<T, F>(ctx: &Context, work: F) -> Result<T, Failure>
where
    T: Send + 'static,
    F: FnOnce(&Context) -> Result<T, Failure> + Send + 'static,
{
    let guard = CancelOnDrop(Some(ctx.clone()));
    let task_ctx = ctx.clone();
    let joined = tokio::task::spawn_blocking(move || work(&task_ctx)).await;
    guard.disarm();
    joined?
}

/// Cancels the request context unless disarmed, e.g. when the client goes
/// away while store work is still running.
struct CancelOnDrop(Option<Context>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(ctx) = self.0.take() {
            ctx.cancel();
        }
    }
}

/// Decodes a JSON request body.
pub(crate) fn read_json<T: DeserializeOwned>(
    body: Result<Bytes, BytesRejection>,
) -> Result<T, Failure> {
    // A body that cannot be buffered means the client stopped sending it.
    let bytes = body.map_err(|_| Failure::Eof)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Extracts a numeric `:id` path segment.
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Failure> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(invalid("id", "must be a positive integer").into()),
    }
}

pub(crate) fn invalid(field: &str, message: &str) -> Error {
    Error::new("invalid_request", message, 400).with_field(field)
}

/// Folds per-field validation errors into one client error.
pub(crate) fn check(mut reasons: Vec<Error>) -> Result<(), Failure> {
    match reasons.len() {
        0 => Ok(()),
        1 => Err(reasons.remove(0).into()),
        _ => Err(Error::new("invalid_request", "request has invalid fields", 400)
            .with_reasons(reasons)
            .into()),
    }
}

/// Maps store sentinels to client errors; everything else stays opaque.
pub(crate) fn store_failure(err: DbError, entity: &str) -> Failure {
    match err {
        DbError::NotFound => not_found(entity).into(),
        DbError::Duplicate => {
            Error::new("duplicate", format!("{entity} already exists"), 409).into()
        }
        other => Failure::unknown(other),
    }
}

pub(crate) fn not_found(entity: &str) -> Error {
    Error::new("not_found", format!("{entity} not found"), 404)
}

#[track_caller]
pub(crate) fn respond<T: Reply>(api: &Api, result: Result<T, Failure>) -> Response {
    match result {
        Ok(value) => api.ok(Some(&value)),
        Err(failure) => api.fail(failure),
    }
}
