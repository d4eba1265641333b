#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{Revision, StoredRoom},
        storage::StorageResult,
    },
    state::room::Room,
};

/// Abstraction over the persistence layer for rooms and the public listing.
pub trait RoomStore: Send + Sync {
    /// Fetch a room along with its current revision.
    fn load(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>>;
    /// Compare-and-swap write.
    ///
    /// `expected` must be the revision the room was loaded at, or `None` for a room
    /// that must not exist yet. Returns the new revision.
    fn save(
        &self,
        room: Room,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>>;
    /// Remove a room; removing an absent room is not an error.
    fn delete(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>>;
    fn add_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>>;
    fn remove_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Identifiers currently advertised in the public listing.
    fn list_public(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
