use serde::{Deserialize, Serialize};

use crate::state::room::Room;

/// Opaque concurrency token attached to a stored room.
///
/// Saving with a stale revision fails with a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wrap a backend-specific revision string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Backend-specific representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Room as loaded from a store, along with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoom {
    /// Canonical record.
    pub room: Room,
    /// Revision to pass back when saving a modified copy.
    pub revision: Revision,
}
