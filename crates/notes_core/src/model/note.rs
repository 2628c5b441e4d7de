//! Note domain model.

use super::timestamp::{Storable, Timestamp};
use serde::{Deserialize, Serialize};

/// A single note row, owned by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    /// Optional; serialized as `null` when unset.
    pub title: Option<String>,
    pub body: String,
    #[serde(flatten)]
    pub timestamp: Timestamp,
}

impl Note {
    /// Builds an unsaved note for `user_id`.
    pub fn new(user_id: i64, title: Option<String>, body: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            title,
            body: body.into(),
            timestamp: Timestamp::default(),
        }
    }
}

impl Storable for Note {
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

/// One or more notes loaded from the store.
pub type Notes = Vec<Note>;
