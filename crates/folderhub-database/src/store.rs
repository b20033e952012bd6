//! Storage traits for the folder hierarchy, album membership, and shares.
//!
//! Read paths and simple attribute writes go through [`FolderStore`].
//! Anything that touches the closure table goes through a
//! [`FolderUnitOfWork`] so that the folder row and its closure rows change
//! together or not at all.

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use folderhub_core::result::AppResult;
use folderhub_entity::folder::{
    ClosureEdge, CreateFolder, Folder, FolderAudit, ParentFilter, UpdateFolder,
};
use folderhub_entity::membership::{FolderAlbum, FolderAlbumPair};
use folderhub_entity::share::{CreateFolderUser, FolderUser, FolderUserAudit, FolderUserRole};

/// Read access to the hierarchy plus non-structural folder writes.
///
/// Soft-deleted folders never appear in results. Raw closure rows
/// ([`FolderStore::closure_edges`]) are returned unfiltered.
#[async_trait]
pub trait FolderStore: Send + Sync + fmt::Debug + 'static {
    /// Find a live folder by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Ancestors of a folder (excluding itself), ordered root → nearest parent.
    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>>;

    /// Every folder below `id` (excluding itself), ordered by name.
    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Folder>>;

    /// Direct children of `parent_id` that `viewer_id` owns or has been
    /// shared, ordered by name.
    async fn find_children(&self, viewer_id: Uuid, parent_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Root folders of an owner, newest first.
    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Number of live direct children per folder. Every requested id is
    /// present in the result, with zero when it has no children.
    async fn child_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>>;

    /// Folders of an owner at the requested level, newest first.
    async fn find_owned(&self, owner_id: Uuid, parent: ParentFilter) -> AppResult<Vec<Folder>>;

    /// Folders shared by or with `user_id`, newest first.
    async fn find_shared(&self, user_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Folders of an owner that are not shared with anyone, newest first.
    async fn find_not_shared(&self, owner_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Folders visible to `viewer_id` that contain `album_id`, newest first.
    async fn find_by_album(&self, viewer_id: Uuid, album_id: Uuid) -> AppResult<Vec<Folder>>;

    /// Raw closure rows where the folder is ancestor or descendant.
    async fn closure_edges(&self, folder_id: Uuid) -> AppResult<Vec<ClosureEdge>>;

    /// Apply attribute changes to a live folder.
    async fn update(&self, id: Uuid, changes: &UpdateFolder) -> AppResult<Folder>;

    /// Bump a folder's update timestamp and token.
    async fn touch(&self, id: Uuid) -> AppResult<()>;

    /// Soft-delete every folder of an owner. Returns the number of rows hidden.
    async fn soft_delete_all(&self, owner_id: Uuid) -> AppResult<u64>;

    /// Undo [`FolderStore::soft_delete_all`]. Returns the number of rows restored.
    async fn restore_all(&self, owner_id: Uuid) -> AppResult<u64>;

    /// Hard-delete every folder of an owner.
    async fn delete_all(&self, owner_id: Uuid) -> AppResult<u64>;

    /// Deletion audit rows for an owner newer than `since`, oldest first.
    async fn find_deleted_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderAudit>>;
}

/// Factory for hierarchy units of work.
#[async_trait]
pub trait FolderBackend: Send + Sync + fmt::Debug + 'static {
    /// Start a new unit of work. Dropping it without [`FolderUnitOfWork::commit`]
    /// discards every change made through it.
    async fn begin(&self) -> AppResult<Box<dyn FolderUnitOfWork>>;
}

/// A transaction over the folder, closure, membership, and share tables.
#[async_trait]
pub trait FolderUnitOfWork: Send {
    /// Find a live folder by ID.
    async fn find_live(&mut self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Insert a folder row. The store allocates the ID.
    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder>;

    /// Every `a` with a closure row `(a, id)`, including `id` itself.
    async fn ancestor_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Every `d` with a closure row `(id, d)`, including `id` itself.
    async fn descendant_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Insert closure rows, silently skipping rows that already exist.
    /// Returns the number of rows actually inserted.
    async fn insert_edges(&mut self, edges: &[ClosureEdge]) -> AppResult<u64>;

    /// Delete every closure row whose descendant is in `subtree` and whose
    /// ancestor is not. Rows inside the subtree are kept.
    async fn detach_subtree(&mut self, subtree: &[Uuid]) -> AppResult<u64>;

    /// Change a folder's parent pointer and apply attribute changes in the
    /// same row update, so the sibling-name rule is checked against the
    /// final parent and name together.
    async fn set_parent(
        &mut self,
        id: Uuid,
        parent_id: Option<Uuid>,
        changes: &UpdateFolder,
    ) -> AppResult<Folder>;

    /// Delete a folder row; closure, membership, share rows and subfolders
    /// go with it. Returns whether the folder existed.
    async fn delete_folder(&mut self, id: Uuid) -> AppResult<bool>;

    /// Link albums to a folder, skipping existing links.
    async fn link_albums(&mut self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64>;

    /// Share a folder with a user and bump the folder's update token.
    async fn add_user(&mut self, data: &CreateFolderUser) -> AppResult<FolderUser>;

    /// Make every change permanent.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Folder ↔ album join table.
#[async_trait]
pub trait AlbumMembershipStore: Send + Sync + fmt::Debug + 'static {
    /// The subset of `candidates` currently linked to the folder.
    async fn member_ids(&self, folder_id: Uuid, candidates: &[Uuid]) -> AppResult<HashSet<Uuid>>;

    /// Insert pairs, skipping pairs that already exist.
    /// Returns the number of rows actually inserted.
    async fn insert_pairs(&self, pairs: &[FolderAlbumPair]) -> AppResult<u64>;

    /// Unlink albums from one folder.
    async fn delete_members(&self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64>;

    /// Unlink albums from every folder.
    async fn delete_from_all(&self, album_ids: &[Uuid]) -> AppResult<u64>;

    /// Number of albums per folder. Every requested id is present.
    async fn member_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>>;

    /// Every album linked to a folder, newest link first.
    async fn list_members(&self, folder_id: Uuid) -> AppResult<Vec<FolderAlbum>>;
}

/// Folder ↔ user share table.
#[async_trait]
pub trait FolderUserStore: Send + Sync + fmt::Debug + 'static {
    /// Share a folder with a user and bump the folder's update token.
    /// Fails with `Conflict` if already shared.
    async fn create(&self, data: &CreateFolderUser) -> AppResult<FolderUser>;

    /// Change the role of an existing share.
    async fn update_role(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        role: FolderUserRole,
    ) -> AppResult<FolderUser>;

    /// Remove a share and record the revocation. Returns whether it existed.
    async fn delete(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Find a single share.
    async fn find(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Option<FolderUser>>;

    /// Every share of a folder, oldest first.
    async fn list_for_folder(&self, folder_id: Uuid) -> AppResult<Vec<FolderUser>>;

    /// Share revocations for a user newer than `since`, oldest first.
    /// Shares removed because their folder was deleted are included.
    async fn find_removed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderUserAudit>>;
}

/// Expand grouped counts so that every requested id has an entry.
pub fn zero_filled(ids: &[Uuid], counts: impl IntoIterator<Item = (Uuid, u64)>) -> HashMap<Uuid, u64> {
    let mut result: HashMap<Uuid, u64> = ids.iter().map(|id| (*id, 0)).collect();
    for (id, count) in counts {
        if let Some(slot) = result.get_mut(&id) {
            *slot = count;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_filled_keeps_missing_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let counts = zero_filled(&[a, b], vec![(a, 2)]);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&a], 2);
        assert_eq!(counts[&b], 0);
    }
}
