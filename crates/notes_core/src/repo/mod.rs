//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define entity-specific data access contracts.
//! - Isolate SQL details from HTTP handlers.
//!
//! # Invariants
//! - Repository APIs return the `NotFound`/`Duplicate` sentinels for expected
//!   outcomes and a wrapped `DatabaseError` for everything else.
//! - Repositories share one `Db` handle; every write is its own unit of work.

pub mod note_repo;
pub mod user_repo;

pub use note_repo::{NoteRepository, SqliteNoteRepository};
pub use user_repo::{SqliteUserRepository, UserRepository};
