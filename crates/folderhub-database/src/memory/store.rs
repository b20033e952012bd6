//! [`MemoryStore`] and its store trait implementations.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use folderhub_core::error::AppError;
use folderhub_core::result::AppResult;
use folderhub_entity::folder::{
    ClosureEdge, Folder, FolderAudit, ParentFilter, UpdateFolder,
};
use folderhub_entity::membership::{FolderAlbum, FolderAlbumPair};
use folderhub_entity::share::{CreateFolderUser, FolderUser, FolderUserAudit, FolderUserRole};

use super::state::MemoryState;
use super::unit_of_work::MemoryUnitOfWork;
use crate::store::{
    AlbumMembershipStore, FolderBackend, FolderStore, FolderUnitOfWork, FolderUserStore,
    zero_filled,
};

/// Folder, closure, membership, and share tables held in memory.
///
/// Cloning shares the underlying state. Units of work are serialised: a
/// second `begin` (or any read) waits until the first unit of work is
/// committed or dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

fn newest_first(mut folders: Vec<Folder>) -> Vec<Folder> {
    folders.sort_by_key(|f| Reverse(f.created_at));
    folders
}

fn by_name(mut folders: Vec<Folder>) -> Vec<Folder> {
    folders.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
    folders
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every closure row, for diagnostics.
    pub async fn closure_snapshot(&self) -> BTreeSet<ClosureEdge> {
        self.state.lock().await.closure.clone()
    }

    /// Parent pointer of every folder, soft-deleted ones included.
    pub async fn parent_pointers(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.state
            .lock()
            .await
            .folders
            .values()
            .map(|f| (f.id, f.parent_id))
            .collect()
    }
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.state.lock().await.live(id).cloned())
    }

    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let mut ancestors: Vec<(usize, Folder)> = state
            .closure
            .iter()
            .filter(|e| e.descendant_id == id && e.ancestor_id != id)
            .filter_map(|e| state.live(e.ancestor_id))
            .map(|f| (state.depth(f.id), f.clone()))
            .collect();
        ancestors.sort_by(|(da, a), (db, b)| da.cmp(db).then(a.created_at.cmp(&b.created_at)));
        Ok(ancestors.into_iter().map(|(_, f)| f).collect())
    }

    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let descendants = state
            .closure
            .iter()
            .filter(|e| e.ancestor_id == id && e.descendant_id != id)
            .filter_map(|e| state.live(e.descendant_id))
            .cloned()
            .collect();
        Ok(by_name(descendants))
    }

    async fn find_children(&self, viewer_id: Uuid, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let children = state
            .live_folders()
            .filter(|f| f.parent_id == Some(parent_id) && state.is_visible(viewer_id, f))
            .cloned()
            .collect();
        Ok(by_name(children))
    }

    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let roots = state
            .live_folders()
            .filter(|f| f.owner_id == owner_id && f.is_root())
            .cloned()
            .collect();
        Ok(newest_first(roots))
    }

    async fn child_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        let state = self.state.lock().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for parent_id in state.live_folders().filter_map(|f| f.parent_id) {
            *counts.entry(parent_id).or_default() += 1;
        }
        Ok(zero_filled(folder_ids, counts))
    }

    async fn find_owned(&self, owner_id: Uuid, parent: ParentFilter) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let folders = state
            .live_folders()
            .filter(|f| f.owner_id == owner_id && parent.matches(f.parent_id))
            .cloned()
            .collect();
        Ok(newest_first(folders))
    }

    async fn find_shared(&self, user_id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let folders = state
            .live_folders()
            .filter(|f| {
                (f.owner_id == user_id && state.has_shares(f.id))
                    || state.is_shared_with(f.id, user_id)
            })
            .cloned()
            .collect();
        Ok(newest_first(folders))
    }

    async fn find_not_shared(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let folders = state
            .live_folders()
            .filter(|f| f.owner_id == owner_id && !state.has_shares(f.id))
            .cloned()
            .collect();
        Ok(newest_first(folders))
    }

    async fn find_by_album(&self, viewer_id: Uuid, album_id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let folders = state
            .live_folders()
            .filter(|f| {
                state
                    .albums
                    .contains_key(&FolderAlbumPair::new(f.id, album_id))
                    && state.is_visible(viewer_id, f)
            })
            .cloned()
            .collect();
        Ok(newest_first(folders))
    }

    async fn closure_edges(&self, folder_id: Uuid) -> AppResult<Vec<ClosureEdge>> {
        let state = self.state.lock().await;
        Ok(state
            .closure
            .iter()
            .filter(|e| e.touches(folder_id))
            .copied()
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &UpdateFolder) -> AppResult<Folder> {
        self.state.lock().await.update_folder(id, changes)
    }

    async fn touch(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.live(id).is_none() {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        }
        let now = state.now();
        if let Some(folder) = state.folders.get_mut(&id) {
            folder.updated_at = now;
            folder.update_id = Uuid::now_v7();
        }
        Ok(())
    }

    async fn soft_delete_all(&self, owner_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let update_id = Uuid::now_v7();
        let mut hidden = 0;
        for folder in state
            .folders
            .values_mut()
            .filter(|f| f.owner_id == owner_id && !f.is_deleted())
        {
            folder.deleted_at = Some(now);
            folder.updated_at = now;
            folder.update_id = update_id;
            hidden += 1;
        }
        Ok(hidden)
    }

    async fn restore_all(&self, owner_id: Uuid) -> AppResult<u64> {
        self.state.lock().await.restore_all(owner_id)
    }

    async fn delete_all(&self, owner_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let owned: Vec<Uuid> = state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id)
            .map(|f| f.id)
            .collect();
        Ok(state.delete_cascade(&owned))
    }

    async fn find_deleted_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderAudit>> {
        let state = self.state.lock().await;
        let mut rows: Vec<FolderAudit> = state
            .audit
            .iter()
            .filter(|a| a.user_id == user_id && a.deleted_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.deleted_at);
        Ok(rows)
    }
}

#[async_trait]
impl FolderBackend for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn FolderUnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork::new(guard)))
    }
}

#[async_trait]
impl AlbumMembershipStore for MemoryStore {
    async fn member_ids(&self, folder_id: Uuid, candidates: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        let state = self.state.lock().await;
        Ok(candidates
            .iter()
            .copied()
            .filter(|&album_id| {
                state
                    .albums
                    .contains_key(&FolderAlbumPair::new(folder_id, album_id))
            })
            .collect())
    }

    async fn insert_pairs(&self, pairs: &[FolderAlbumPair]) -> AppResult<u64> {
        self.state.lock().await.link_albums(pairs)
    }

    async fn delete_members(&self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut removed = 0;
        for &album_id in album_ids {
            if state
                .albums
                .remove(&FolderAlbumPair::new(folder_id, album_id))
                .is_some()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_from_all(&self, album_ids: &[Uuid]) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.albums.len();
        state.albums.retain(|pair, _| !album_ids.contains(&pair.album_id));
        Ok((before - state.albums.len()) as u64)
    }

    async fn member_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        let state = self.state.lock().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for pair in state.albums.keys() {
            *counts.entry(pair.folder_id).or_default() += 1;
        }
        Ok(zero_filled(folder_ids, counts))
    }

    async fn list_members(&self, folder_id: Uuid) -> AppResult<Vec<FolderAlbum>> {
        let state = self.state.lock().await;
        let mut members: Vec<FolderAlbum> = state
            .albums
            .values()
            .filter(|a| a.folder_id == folder_id)
            .cloned()
            .collect();
        members.sort_by_key(|a| Reverse(a.created_at));
        Ok(members)
    }
}

#[async_trait]
impl FolderUserStore for MemoryStore {
    async fn create(&self, data: &CreateFolderUser) -> AppResult<FolderUser> {
        self.state.lock().await.add_user(data)
    }

    async fn update_role(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        role: FolderUserRole,
    ) -> AppResult<FolderUser> {
        let mut state = self.state.lock().await;
        let now = state.now();
        let share = state
            .users
            .get_mut(&(folder_id, user_id))
            .ok_or_else(|| AppError::not_found("Folder is not shared with this user"))?;
        share.role = role;
        share.updated_at = now;
        Ok(share.clone())
    }

    async fn delete(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.state.lock().await.remove_user(folder_id, user_id))
    }

    async fn find(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Option<FolderUser>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&(folder_id, user_id))
            .cloned())
    }

    async fn list_for_folder(&self, folder_id: Uuid) -> AppResult<Vec<FolderUser>> {
        let state = self.state.lock().await;
        let mut shares: Vec<FolderUser> = state
            .users
            .values()
            .filter(|s| s.folder_id == folder_id)
            .cloned()
            .collect();
        shares.sort_by_key(|s| s.created_at);
        Ok(shares)
    }

    async fn find_removed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderUserAudit>> {
        let state = self.state.lock().await;
        let mut rows: Vec<FolderUserAudit> = state
            .share_audit
            .iter()
            .filter(|a| a.user_id == user_id && a.deleted_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.deleted_at);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use folderhub_core::error::ErrorKind;
    use folderhub_entity::folder::CreateFolder;

    use super::*;
    use crate::ClosureMaintainer;
    use folderhub_core::config::StoreConfig;

    fn maintainer(store: &MemoryStore) -> ClosureMaintainer {
        ClosureMaintainer::new(Arc::new(store.clone()), &StoreConfig::default())
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        {
            let mut uow = store.begin().await.unwrap();
            let folder = uow
                .insert_folder(&CreateFolder::root(owner, "draft"))
                .await
                .unwrap();
            uow.insert_edges(&[ClosureEdge::reflexive(folder.id)])
                .await
                .unwrap();
        }
        assert!(store.find_roots(owner).await.unwrap().is_empty());
        assert!(store.closure_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_child_counts_are_zero_filled() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let a = m.create_folder(&CreateFolder::root(owner, "a")).await.unwrap();
        let b = m.create_folder(&CreateFolder::root(owner, "b")).await.unwrap();
        m.create_folder(&CreateFolder::child(owner, a.id, "a1")).await.unwrap();
        m.create_folder(&CreateFolder::child(owner, a.id, "a2")).await.unwrap();

        let counts = store.child_counts(&[a.id, b.id]).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&a.id], 2);
        assert_eq!(counts[&b.id], 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_folders_are_hidden_and_restorable() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let root = m.create_folder(&CreateFolder::root(owner, "r")).await.unwrap();
        let child = m
            .create_folder(&CreateFolder::child(owner, root.id, "c"))
            .await
            .unwrap();

        assert_eq!(store.soft_delete_all(owner).await.unwrap(), 2);
        assert!(store.find_by_id(root.id).await.unwrap().is_none());
        assert!(store.find_descendants(root.id).await.unwrap().is_empty());
        assert_eq!(store.child_counts(&[root.id]).await.unwrap()[&root.id], 0);
        // Raw closure rows stay.
        assert_eq!(store.closure_edges(child.id).await.unwrap().len(), 2);

        assert_eq!(store.restore_all(owner).await.unwrap(), 2);
        assert_eq!(store.find_ancestors(child.id).await.unwrap()[0].id, root.id);
    }

    #[tokio::test]
    async fn test_restore_all_rejects_name_taken_by_live_sibling() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let old = m.create_folder(&CreateFolder::root(owner, "trip")).await.unwrap();
        let kept = m.create_folder(&CreateFolder::root(owner, "kept")).await.unwrap();
        store.soft_delete_all(owner).await.unwrap();
        let fresh = m.create_folder(&CreateFolder::root(owner, "trip")).await.unwrap();

        let err = store.restore_all(owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        // Nothing was restored, not even the folder without a clash.
        assert!(store.find_by_id(old.id).await.unwrap().is_none());
        assert!(store.find_by_id(kept.id).await.unwrap().is_none());
        assert!(store.find_by_id(fresh.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_rejects_duplicate_sibling_name() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        m.create_folder(&CreateFolder::root(owner, "taken")).await.unwrap();
        let other = m.create_folder(&CreateFolder::root(owner, "free")).await.unwrap();

        let changes = UpdateFolder {
            name: Some("taken".to_string()),
            ..Default::default()
        };
        let err = store.update(other.id, &changes).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let changes = UpdateFolder {
            description: Some("holiday pictures".to_string()),
            ..Default::default()
        };
        let updated = store.update(other.id, &changes).await.unwrap();
        assert_eq!(updated.description, "holiday pictures");
        assert_ne!(updated.update_id, other.update_id);
    }

    #[tokio::test]
    async fn test_shared_and_not_shared_listings() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let shared = m.create_folder(&CreateFolder::root(owner, "s")).await.unwrap();
        let private = m.create_folder(&CreateFolder::root(owner, "p")).await.unwrap();
        store
            .create(&CreateFolderUser {
                folder_id: shared.id,
                user_id: guest,
                role: FolderUserRole::Viewer,
            })
            .await
            .unwrap();

        let ids = |folders: Vec<Folder>| folders.into_iter().map(|f| f.id).collect::<Vec<_>>();
        assert_eq!(ids(store.find_shared(owner).await.unwrap()), vec![shared.id]);
        assert_eq!(ids(store.find_shared(guest).await.unwrap()), vec![shared.id]);
        assert_eq!(ids(store.find_not_shared(owner).await.unwrap()), vec![private.id]);
        assert!(store.find_children(guest, shared.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_writes_audit_rows() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let before = Utc::now() - Duration::seconds(1);
        let root = m.create_folder(&CreateFolder::root(owner, "r")).await.unwrap();
        m.create_folder(&CreateFolder::child(owner, root.id, "c")).await.unwrap();

        assert_eq!(store.delete_all(owner).await.unwrap(), 2);
        let audit = store.find_deleted_since(owner, before).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert!(audit.iter().any(|a| a.folder_id == root.id));
        assert!(store.closure_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_removed_shares_are_audited() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let before = Utc::now() - Duration::seconds(1);
        let kept = m.create_folder(&CreateFolder::root(owner, "kept")).await.unwrap();
        let doomed = m.create_folder(&CreateFolder::root(owner, "doomed")).await.unwrap();
        for folder_id in [kept.id, doomed.id] {
            store
                .create(&CreateFolderUser {
                    folder_id,
                    user_id: guest,
                    role: FolderUserRole::Viewer,
                })
                .await
                .unwrap();
        }

        assert!(store.delete(kept.id, guest).await.unwrap());
        assert!(!store.delete(kept.id, guest).await.unwrap());
        m.delete_folder(doomed.id).await.unwrap();

        let removed = store.find_removed_since(guest, before).await.unwrap();
        let folders: Vec<Uuid> = removed.iter().map(|a| a.folder_id).collect();
        assert_eq!(folders, vec![kept.id, doomed.id]);
        assert!(store.find_removed_since(owner, before).await.unwrap().is_empty());
        assert!(
            store
                .find_removed_since(guest, removed[1].deleted_at)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_sharing_a_folder_bumps_its_update_token() {
        let store = MemoryStore::new();
        let m = maintainer(&store);
        let owner = Uuid::new_v4();
        let folder = m.create_folder(&CreateFolder::root(owner, "s")).await.unwrap();
        store
            .create(&CreateFolderUser {
                folder_id: folder.id,
                user_id: Uuid::new_v4(),
                role: FolderUserRole::Editor,
            })
            .await
            .unwrap();

        let touched = store.find_by_id(folder.id).await.unwrap().unwrap();
        assert_ne!(touched.update_id, folder.update_id);
    }
}
