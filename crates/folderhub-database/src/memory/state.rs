//! Tables and integrity rules of the in-memory store.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use folderhub_core::error::AppError;
use folderhub_core::result::AppResult;
use folderhub_entity::folder::{ClosureEdge, CreateFolder, Folder, FolderAudit, UpdateFolder};
use folderhub_entity::membership::{FolderAlbum, FolderAlbumPair};
use folderhub_entity::share::{CreateFolderUser, FolderUser, FolderUserAudit};

/// Every table of the store. Cloned wholesale for unit-of-work snapshots.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    pub folders: HashMap<Uuid, Folder>,
    pub closure: BTreeSet<ClosureEdge>,
    pub albums: HashMap<FolderAlbumPair, FolderAlbum>,
    pub users: HashMap<(Uuid, Uuid), FolderUser>,
    pub audit: Vec<FolderAudit>,
    pub share_audit: Vec<FolderUserAudit>,
    last_tick: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamp, so "newest first" orderings are stable.
    pub fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_tick {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_tick = Some(now);
        now
    }

    pub fn live(&self, id: Uuid) -> Option<&Folder> {
        self.folders.get(&id).filter(|f| !f.is_deleted())
    }

    pub fn live_folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values().filter(|f| !f.is_deleted())
    }

    pub fn is_shared_with(&self, folder_id: Uuid, user_id: Uuid) -> bool {
        self.users.contains_key(&(folder_id, user_id))
    }

    pub fn has_shares(&self, folder_id: Uuid) -> bool {
        self.users.keys().any(|(f, _)| *f == folder_id)
    }

    /// Owner or explicit share.
    pub fn is_visible(&self, viewer_id: Uuid, folder: &Folder) -> bool {
        folder.owner_id == viewer_id || self.is_shared_with(folder.id, viewer_id)
    }

    /// Number of closure rows a folder descends from; root folders have depth one.
    pub fn depth(&self, id: Uuid) -> usize {
        self.closure.iter().filter(|e| e.descendant_id == id).count()
    }

    /// Reject a live sibling with the same owner, parent, and name.
    pub fn ensure_unique_name(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        except: Option<Uuid>,
    ) -> AppResult<()> {
        let clash = self.live_folders().any(|f| {
            Some(f.id) != except
                && f.owner_id == owner_id
                && f.parent_id == parent_id
                && f.name == name
        });
        if clash {
            return Err(AppError::conflict(format!(
                "Folder '{name}' already exists here"
            )));
        }
        Ok(())
    }

    pub fn ensure_folder_exists(&self, folder_id: Uuid) -> AppResult<()> {
        if !self.folders.contains_key(&folder_id) {
            return Err(AppError::database(format!(
                "Foreign key violation: folder {folder_id} does not exist"
            )));
        }
        Ok(())
    }

    pub fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder> {
        if let Some(parent_id) = data.parent_id {
            self.ensure_folder_exists(parent_id)?;
        }
        self.ensure_unique_name(data.owner_id, data.parent_id, &data.name, None)?;

        let now = self.now();
        let folder = Folder {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            name: data.name.clone(),
            description: data.description.clone(),
            parent_id: data.parent_id,
            thumbnail_asset_id: None,
            is_activity_enabled: true,
            asset_order: data.asset_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            update_id: Uuid::now_v7(),
        };
        self.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    /// Apply attribute changes to a live folder, checking the final name
    /// against its siblings.
    pub fn update_folder(&mut self, id: Uuid, changes: &UpdateFolder) -> AppResult<Folder> {
        let parent_id = self
            .live(id)
            .map(|f| f.parent_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        self.set_parent(id, parent_id, changes)
    }

    /// Reparent a live folder and apply attribute changes in one step.
    pub fn set_parent(
        &mut self,
        id: Uuid,
        parent_id: Option<Uuid>,
        changes: &UpdateFolder,
    ) -> AppResult<Folder> {
        if let Some(parent_id) = parent_id {
            self.ensure_folder_exists(parent_id)?;
        }
        let (owner_id, name) = match self.live(id) {
            Some(folder) => (
                folder.owner_id,
                changes.name.clone().unwrap_or_else(|| folder.name.clone()),
            ),
            None => return Err(AppError::not_found(format!("Folder {id} not found"))),
        };
        self.ensure_unique_name(owner_id, parent_id, &name, Some(id))?;

        let now = self.now();
        let folder = self
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        changes.apply_to(folder);
        folder.parent_id = parent_id;
        folder.updated_at = now;
        folder.update_id = Uuid::now_v7();
        Ok(folder.clone())
    }

    /// Bring back every soft-deleted folder of an owner.
    ///
    /// Fails with `Conflict`, leaving every folder untouched, when a restored
    /// folder would share its name with a live sibling or another restored one.
    pub fn restore_all(&mut self, owner_id: Uuid) -> AppResult<u64> {
        let mut candidates: Vec<(Uuid, Option<Uuid>, String)> = self
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && f.is_deleted())
            .map(|f| (f.id, f.parent_id, f.name.clone()))
            .collect();
        candidates.sort();

        let mut claimed: BTreeSet<(Option<Uuid>, &str)> = BTreeSet::new();
        for (_, parent_id, name) in &candidates {
            self.ensure_unique_name(owner_id, *parent_id, name, None)?;
            if !claimed.insert((*parent_id, name.as_str())) {
                return Err(AppError::conflict(format!(
                    "Folder '{name}' already exists here"
                )));
            }
        }

        let now = self.now();
        let update_id = Uuid::now_v7();
        for (id, _, _) in &candidates {
            if let Some(folder) = self.folders.get_mut(id) {
                folder.deleted_at = None;
                folder.updated_at = now;
                folder.update_id = update_id;
            }
        }
        Ok(candidates.len() as u64)
    }

    pub fn add_user(&mut self, data: &CreateFolderUser) -> AppResult<FolderUser> {
        self.ensure_folder_exists(data.folder_id)?;
        if self.is_shared_with(data.folder_id, data.user_id) {
            return Err(AppError::conflict(format!(
                "Folder is already shared with user {}",
                data.user_id
            )));
        }

        let now = self.now();
        let share = FolderUser {
            folder_id: data.folder_id,
            user_id: data.user_id,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert((data.folder_id, data.user_id), share.clone());
        if let Some(folder) = self.folders.get_mut(&data.folder_id) {
            folder.updated_at = now;
            folder.update_id = Uuid::now_v7();
        }
        Ok(share)
    }

    /// Remove a share and record the revocation.
    pub fn remove_user(&mut self, folder_id: Uuid, user_id: Uuid) -> bool {
        if self.users.remove(&(folder_id, user_id)).is_none() {
            return false;
        }
        let deleted_at = self.now();
        self.share_audit.push(FolderUserAudit {
            id: Uuid::now_v7(),
            folder_id,
            user_id,
            deleted_at,
        });
        true
    }

    pub fn link_albums(&mut self, pairs: &[FolderAlbumPair]) -> AppResult<u64> {
        for pair in pairs {
            self.ensure_folder_exists(pair.folder_id)?;
        }

        let mut inserted = 0;
        for pair in pairs {
            if self.albums.contains_key(pair) {
                continue;
            }
            let created_at = self.now();
            self.albums.insert(
                *pair,
                FolderAlbum {
                    folder_id: pair.folder_id,
                    album_id: pair.album_id,
                    created_at,
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Delete folders and everything referencing them, following the parent
    /// pointer cascade to every subfolder. Writes one audit row per folder.
    pub fn delete_cascade(&mut self, roots: &[Uuid]) -> u64 {
        let mut doomed: BTreeSet<Uuid> = roots
            .iter()
            .copied()
            .filter(|id| self.folders.contains_key(id))
            .collect();

        loop {
            let children: Vec<Uuid> = self
                .folders
                .values()
                .filter(|f| f.parent_id.is_some_and(|p| doomed.contains(&p)))
                .map(|f| f.id)
                .filter(|id| !doomed.contains(id))
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        let deleted_at = self.now();
        for id in &doomed {
            if let Some(folder) = self.folders.remove(id) {
                self.audit.push(FolderAudit {
                    id: Uuid::now_v7(),
                    folder_id: folder.id,
                    user_id: folder.owner_id,
                    deleted_at,
                });
            }
        }

        self.closure
            .retain(|e| !doomed.contains(&e.ancestor_id) && !doomed.contains(&e.descendant_id));
        self.albums.retain(|pair, _| !doomed.contains(&pair.folder_id));
        let revoked: Vec<(Uuid, Uuid)> = self
            .users
            .keys()
            .filter(|(folder_id, _)| doomed.contains(folder_id))
            .copied()
            .collect();
        for (folder_id, user_id) in revoked {
            self.remove_user(folder_id, user_id);
        }

        doomed.len() as u64
    }
}
