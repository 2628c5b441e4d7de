//! User domain model.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `password` holds a password hash and is never serialized.

use super::timestamp::{Storable, Timestamp};
use serde::{Deserialize, Serialize};

/// A single user row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: Vec<u8>,
    #[serde(flatten)]
    pub timestamp: Timestamp,
}

impl User {
    /// Builds an unsaved user. `id` and timestamps are populated on insert.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            password: password.into(),
            timestamp: Timestamp::default(),
        }
    }
}

impl Storable for User {
    fn row_id(&self) -> i64 {
        self.id
    }

    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    fn timestamp_mut(&mut self) -> &mut Timestamp {
        &mut self.timestamp
    }
}

/// One or more users loaded from the store.
pub type Users = Vec<User>;
