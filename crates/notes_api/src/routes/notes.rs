//! Note handlers. Soft-deleted notes are reported as not found.

use super::{check, invalid, not_found, path_id, read_json, respond, run_blocking, store_failure};
use crate::response::{Created, Failure};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use notes_core::{
    Context, Error, Limit, Note, NoteRepository, SqliteNoteRepository, UserRepository,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct NoteInput {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: String,
}

impl NoteInput {
    fn validate(&self) -> Result<(), Failure> {
        let mut reasons: Vec<Error> = Vec::new();
        if self.body.trim().is_empty() {
            reasons.push(invalid("body", "is required"));
        }
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            reasons.push(invalid("title", "must not be blank"));
        }
        check(reasons)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    limit: Option<i64>,
}

/// `POST /users/:id/notes`
pub(crate) async fn create(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let input = match path_id(path).and_then(|user_id| {
        let input: NoteInput = read_json(body)?;
        input.validate()?;
        Ok((user_id, input))
    }) {
        Ok(input) => input,
        Err(failure) => return api.fail(failure),
    };

    let (users, notes) = (state.users.clone(), state.notes.clone());
    let created = run_blocking(&ctx, move |ctx| {
        let (user_id, input) = input;
        users
            .get_by_id(ctx, user_id)
            .map_err(|err| store_failure(err, "user"))?;

        let mut note = Note::new(user_id, input.title, input.body);
        notes
            .create(ctx, &mut note)
            .map_err(|err| store_failure(err, "note"))?;
        Ok(Created(note))
    })
    .await;
    respond(&api, created)
}

/// `GET /users/:id/notes?limit=N`
pub(crate) async fn list(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let user_id = match path_id(path) {
        Ok(id) => id,
        Err(failure) => return api.fail(failure),
    };
    let limit = match query {
        Ok(Query(params)) => Limit::from(params.limit.unwrap_or_default()),
        Err(_) => return api.fail(invalid("limit", "must be an integer")),
    };

    let (users, notes) = (state.users.clone(), state.notes.clone());
    let listed = run_blocking(&ctx, move |ctx| {
        users
            .get_by_id(ctx, user_id)
            .map_err(|err| store_failure(err, "user"))?;
        notes
            .list_by_user(ctx, user_id, limit)
            .map_err(|err| store_failure(err, "note"))
    })
    .await;
    respond(&api, listed)
}

/// `GET /notes/:id`
pub(crate) async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let id = match path_id(path) {
        Ok(id) => id,
        Err(failure) => return api.fail(failure),
    };

    let notes = state.notes.clone();
    let found = run_blocking(&ctx, move |ctx| live_note(&notes, ctx, id)).await;
    respond(&api, found)
}

/// `PUT /notes/:id`
pub(crate) async fn update(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let input = match path_id(path).and_then(|id| {
        let input: NoteInput = read_json(body)?;
        input.validate()?;
        Ok((id, input))
    }) {
        Ok(input) => input,
        Err(failure) => return api.fail(failure),
    };

    let notes = state.notes.clone();
    let updated = run_blocking(&ctx, move |ctx| {
        let (id, input) = input;
        let mut note = live_note(&notes, ctx, id)?;
        note.title = input.title;
        note.body = input.body;
        notes
            .update(ctx, &mut note)
            .map_err(|err| store_failure(err, "note"))?;
        Ok(note)
    })
    .await;
    respond(&api, updated)
}

/// `DELETE /notes/:id`
pub(crate) async fn delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let id = match path_id(path) {
        Ok(id) => id,
        Err(failure) => return api.fail(failure),
    };

    let notes = state.notes.clone();
    let deleted = run_blocking(&ctx, move |ctx| {
        let mut note = live_note(&notes, ctx, id)?;
        notes
            .delete(ctx, &mut note)
            .map_err(|err| store_failure(err, "note"))
    })
    .await;

    match deleted {
        Ok(()) => api.ok::<Note>(None),
        Err(failure) => api.fail(failure),
    }
}

fn live_note(notes: &SqliteNoteRepository, ctx: &Context, id: i64) -> Result<Note, Failure> {
    let note = notes
        .get_by_id(ctx, id)
        .map_err(|err| store_failure(err, "note"))?;
    if note.timestamp.is_deleted() {
        return Err(not_found("note").into());
    }
    Ok(note)
}
