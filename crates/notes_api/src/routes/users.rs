//! User handlers.

use super::{check, invalid, path_id, read_json, respond, run_blocking, store_failure};
use crate::response::{Created, Failure};
use crate::state::AppState;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use notes_core::{Error, User, UserRepository};
use serde::Deserialize;

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub(crate) struct NewUser {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl NewUser {
    fn validate(&self) -> Result<(), Failure> {
        let mut reasons: Vec<Error> = Vec::new();
        if self.username.trim().is_empty() {
            reasons.push(invalid("username", "is required"));
        }
        if !self.email.trim().contains('@') {
            reasons.push(invalid("email", "must be an email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            reasons.push(invalid("password", "must be at least 8 characters"));
        }
        check(reasons)
    }
}

/// `POST /users`
pub(crate) async fn create(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let input: NewUser = match read_json(body) {
        Ok(input) => input,
        Err(failure) => return api.fail(failure),
    };
    if let Err(failure) = input.validate() {
        return api.fail(failure);
    }

    let users = state.users.clone();
    let created = run_blocking(&ctx, move |ctx| {
        let hash = hash_password(&input.password)?;
        let mut user = User::new(input.username.trim(), input.email.trim(), hash);
        users
            .create(ctx, &mut user)
            .map_err(|err| store_failure(err, "user"))?;
        Ok(Created(user))
    })
    .await;

    if let Ok(Created(user)) = &created {
        api.log().info("user_created", &[("user_id", &user.id)]);
    }
    respond(&api, created)
}

/// `GET /users/:id`
pub(crate) async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Response {
    let (ctx, api) = state.begin();
    let id = match path_id(path) {
        Ok(id) => id,
        Err(failure) => return api.fail(failure),
    };

    let users = state.users.clone();
    let found = run_blocking(&ctx, move |ctx| {
        users
            .get_by_id(ctx, id)
            .map_err(|err| store_failure(err, "user"))
    })
    .await;
    respond(&api, found)
}

/// Hashes `password` into a PHC string using Argon2id with a random salt.
fn hash_password(password: &str) -> Result<Vec<u8>, Failure> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string().into_bytes())
        .map_err(Failure::unknown)
}
