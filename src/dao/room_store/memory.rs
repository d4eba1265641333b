use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, DashSet, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{Revision, StoredRoom},
        room_store::RoomStore,
        storage::{StorageError, StorageResult},
    },
    state::room::Room,
};

/// Process-local store, the default backend and the one used by tests.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rooms: DashMap<String, StoredRoom>,
    public: DashSet<String>,
    last_revision: AtomicU64,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn load(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Option<StoredRoom>>> {
        let stored = self.inner.rooms.get(room_id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(stored) })
    }

    fn save(
        &self,
        room: Room,
        expected: Option<Revision>,
    ) -> BoxFuture<'static, StorageResult<Revision>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let revision = Revision::new(
                (inner.last_revision.fetch_add(1, Ordering::Relaxed) + 1).to_string(),
            );
            let room_id = room.id.clone();
            let stored = StoredRoom {
                room,
                revision: revision.clone(),
            };

            match inner.rooms.entry(room_id.clone()) {
                Entry::Occupied(mut entry) if Some(&entry.get().revision) == expected.as_ref() => {
                    entry.insert(stored);
                }
                Entry::Vacant(entry) if expected.is_none() => {
                    entry.insert(stored);
                }
                _ => return Err(StorageError::Conflict { room_id }),
            }
            Ok(revision)
        })
    }

    fn delete(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.rooms.remove(room_id);
        self.inner.public.remove(room_id);
        Box::pin(async { Ok(()) })
    }

    fn add_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.public.insert(room_id.to_string());
        Box::pin(async { Ok(()) })
    }

    fn remove_public(&self, room_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.public.remove(room_id);
        Box::pin(async { Ok(()) })
    }

    fn list_public(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let ids = self
            .inner
            .public
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        Box::pin(async move { Ok(ids) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
