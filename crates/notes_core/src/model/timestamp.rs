//! Audit and soft-delete timestamps shared by every stored entity.
//!
//! # Responsibility
//! - Own the create/update/delete lifecycle of `created_at`, `updated_at`
//!   and `deleted_at`.
//! - Let entities opt in through composition plus [`Storable`] forwarding.
//!
//! # Invariants
//! - `created_at` only changes through [`Timestamp::created`].
//! - `updated_at` never moves backwards, even if the wall clock does.
//! - `deleted_at`, when set, is never earlier than `updated_at`.
//! - Any write (`created`/`updated`) clears the soft-delete marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps required of every database model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamp {
    /// Sets `created_at` and `updated_at` to now, overwriting earlier values,
    /// and clears `deleted_at`.
    pub fn created(&mut self) {
        let now = Utc::now();
        self.created_at = now;
        self.updated_at = now;
        self.deleted_at = None;
    }

    /// Refreshes `updated_at` and clears `deleted_at`.
    pub fn updated(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
        self.deleted_at = None;
    }

    /// Sets the soft-delete marker.
    pub fn deleted(&mut self) {
        self.deleted_at = Some(Utc::now().max(self.updated_at));
    }

    /// Returns whether the entity carries a soft-delete marker.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Common interface implemented by all objects persisted in the store.
///
/// Implementors only expose their identity and their [`Timestamp`] block;
/// lifecycle transitions are forwarded to the shared implementation.
pub trait Storable {
    /// Unique ID of the object, assigned by the store on insert.
    fn row_id(&self) -> i64;

    fn timestamp(&self) -> &Timestamp;

    fn timestamp_mut(&mut self) -> &mut Timestamp;

    /// See [`Timestamp::created`].
    fn created(&mut self) {
        self.timestamp_mut().created();
    }

    /// See [`Timestamp::updated`].
    fn updated(&mut self) {
        self.timestamp_mut().updated();
    }

    /// See [`Timestamp::deleted`].
    fn deleted(&mut self) {
        self.timestamp_mut().deleted();
    }
}
