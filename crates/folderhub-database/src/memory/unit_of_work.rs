//! Snapshot-based unit of work for the in-memory store.

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use folderhub_core::result::AppResult;
use folderhub_entity::folder::{ClosureEdge, CreateFolder, Folder, UpdateFolder};
use folderhub_entity::membership::FolderAlbumPair;
use folderhub_entity::share::{CreateFolderUser, FolderUser};

use super::state::MemoryState;
use crate::store::FolderUnitOfWork;

/// Exclusive access to the store state for the lifetime of the unit of work.
pub(crate) struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    /// State as it was when the unit of work began; `None` once committed.
    snapshot: Option<MemoryState>,
}

impl MemoryUnitOfWork {
    pub fn new(guard: OwnedMutexGuard<MemoryState>) -> Self {
        let snapshot = Some(guard.clone());
        Self { guard, snapshot }
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl FolderUnitOfWork for MemoryUnitOfWork {
    async fn find_live(&mut self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.guard.live(id).cloned())
    }

    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder> {
        self.guard.insert_folder(data)
    }

    async fn ancestor_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .guard
            .closure
            .iter()
            .filter(|e| e.descendant_id == id)
            .map(|e| e.ancestor_id)
            .collect())
    }

    async fn descendant_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .guard
            .closure
            .iter()
            .filter(|e| e.ancestor_id == id)
            .map(|e| e.descendant_id)
            .collect())
    }

    async fn insert_edges(&mut self, edges: &[ClosureEdge]) -> AppResult<u64> {
        for edge in edges {
            self.guard.ensure_folder_exists(edge.ancestor_id)?;
            self.guard.ensure_folder_exists(edge.descendant_id)?;
        }

        let mut inserted = 0;
        for edge in edges {
            if self.guard.closure.insert(*edge) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn detach_subtree(&mut self, subtree: &[Uuid]) -> AppResult<u64> {
        let before = self.guard.closure.len();
        self.guard.closure.retain(|e| {
            !(subtree.contains(&e.descendant_id) && !subtree.contains(&e.ancestor_id))
        });
        Ok((before - self.guard.closure.len()) as u64)
    }

    async fn set_parent(
        &mut self,
        id: Uuid,
        parent_id: Option<Uuid>,
        changes: &UpdateFolder,
    ) -> AppResult<Folder> {
        self.guard.set_parent(id, parent_id, changes)
    }

    async fn delete_folder(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.guard.delete_cascade(&[id]) > 0)
    }

    async fn link_albums(&mut self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64> {
        let pairs: Vec<FolderAlbumPair> = album_ids
            .iter()
            .map(|&album_id| FolderAlbumPair::new(folder_id, album_id))
            .collect();
        self.guard.link_albums(&pairs)
    }

    async fn add_user(&mut self, data: &CreateFolderUser) -> AppResult<FolderUser> {
        self.guard.add_user(data)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }
}
