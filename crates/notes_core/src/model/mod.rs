//! Domain model for the notes service.
//!
//! # Responsibility
//! - Define the entities persisted in the store and the client-facing error.
//! - Share timestamp lifecycle behavior through [`Storable`].
//!
//! # Invariants
//! - Entities are never physically removed; deletion is a `deleted_at` marker.

pub mod error;
pub mod note;
pub mod timestamp;
pub mod user;

pub use error::{Error, ErrorWrapper};
pub use note::{Note, Notes};
pub use timestamp::{Storable, Timestamp};
pub use user::{User, Users};
