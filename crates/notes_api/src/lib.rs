//! HTTP surface for the notes service.
//!
//! # Responsibility
//! - Translate handler outcomes into status codes and JSON bodies through a
//!   single response contract ([`Api`]).
//! - Wire user and note handlers onto an axum [`axum::Router`].
//!
//! # Invariants
//! - Only structured [`notes_core::Error`] values reach clients verbatim.
//! - Store work never runs on async worker threads.

mod response;
mod routes;
mod state;

pub use response::{Api, Created, Failure, Reply};
pub use routes::router;
pub use state::AppState;
