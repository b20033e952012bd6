//! Closure table maintenance.
//!
//! Keeps `folder_closure` an exact transitive closure of the parent
//! relation as folders are created, reparented, and deleted. Each operation
//! runs in a single unit of work; any error drops the unit of work, which
//! rolls back every statement issued so far.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use folderhub_core::config::StoreConfig;
use folderhub_core::error::AppError;
use folderhub_core::result::AppResult;
use folderhub_entity::folder::{ClosureEdge, CreateFolder, Folder, UpdateFolder};
use folderhub_entity::share::{CreateFolderUser, FolderUser, FolderUserRole};

use crate::store::{FolderBackend, FolderUnitOfWork};

/// Orchestrates hierarchy mutations against a [`FolderBackend`].
#[derive(Debug, Clone)]
pub struct ClosureMaintainer {
    /// Source of units of work.
    backend: Arc<dyn FolderBackend>,
    /// Maximum closure rows per insert statement.
    batch_size: usize,
}

impl ClosureMaintainer {
    /// Create a maintainer over a backend.
    pub fn new(backend: Arc<dyn FolderBackend>, config: &StoreConfig) -> Self {
        Self {
            backend,
            batch_size: config.effective_batch_size(),
        }
    }

    /// Create a folder and its closure rows.
    ///
    /// Inserts the reflexive row and, when a parent is given, one row per
    /// ancestor of the parent (the parent included).
    pub async fn create_folder(&self, data: &CreateFolder) -> AppResult<Folder> {
        self.create_folder_with_members(data, &[], &[]).await
    }

    /// Create a folder together with its initial albums and shared users,
    /// all in the same unit of work.
    pub async fn create_folder_with_members(
        &self,
        data: &CreateFolder,
        album_ids: &[Uuid],
        users: &[(Uuid, FolderUserRole)],
    ) -> AppResult<Folder> {
        let mut uow = self.backend.begin().await?;

        if let Some(parent_id) = data.parent_id {
            if uow.find_live(parent_id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Parent folder {parent_id} not found"
                )));
            }
        }

        let folder = uow.insert_folder(data).await?;

        let mut edges = vec![ClosureEdge::reflexive(folder.id)];
        if let Some(parent_id) = data.parent_id {
            let ancestors = uow.ancestor_ids(parent_id).await?;
            edges.extend(
                ancestors
                    .into_iter()
                    .map(|ancestor_id| ClosureEdge::new(ancestor_id, folder.id)),
            );
        }
        self.insert_edges(uow.as_mut(), &edges).await?;

        for chunk in album_ids.chunks(self.batch_size) {
            uow.link_albums(folder.id, chunk).await?;
        }

        for &(user_id, role) in users {
            uow.add_user(&CreateFolderUser {
                folder_id: folder.id,
                user_id,
                role,
            })
            .await?;
        }

        uow.commit().await?;

        info!(
            folder_id = %folder.id,
            owner_id = %folder.owner_id,
            parent_id = ?folder.parent_id,
            closure_rows = edges.len(),
            "Folder created"
        );

        Ok(folder)
    }

    /// Move a folder (and its whole subtree) under a new parent, or to the
    /// root when `new_parent_id` is `None`.
    ///
    /// Fails with `InvalidOperation` when the new parent lies inside the
    /// moved subtree (the folder itself included) and with `NotFound` when
    /// either folder is missing. Both checks run before any mutation.
    pub async fn move_folder(&self, id: Uuid, new_parent_id: Option<Uuid>) -> AppResult<Folder> {
        self.move_and_update(id, new_parent_id, &UpdateFolder::default())
            .await
    }

    /// Move a folder and change its attributes in the same unit of work.
    ///
    /// The sibling-name rule is checked against the new name under the new
    /// parent; a conflict leaves both the position and the attributes as
    /// they were.
    pub async fn move_and_update(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
        changes: &UpdateFolder,
    ) -> AppResult<Folder> {
        let mut uow = self.backend.begin().await?;

        uow.find_live(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let subtree = uow.descendant_ids(id).await?;

        if let Some(parent_id) = new_parent_id {
            if subtree.contains(&parent_id) {
                return Err(AppError::invalid_operation(
                    "Cannot move folder into its own subfolder",
                ));
            }
            if uow.find_live(parent_id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Parent folder {parent_id} not found"
                )));
            }
        }

        let detached = uow.detach_subtree(&subtree).await?;
        let folder = uow.set_parent(id, new_parent_id, changes).await?;

        let mut attached = 0;
        if let Some(parent_id) = new_parent_id {
            let ancestors = uow.ancestor_ids(parent_id).await?;
            let edges = ClosureEdge::cross(&ancestors, &subtree);
            attached = self.insert_edges(uow.as_mut(), &edges).await?;
        }

        uow.commit().await?;

        info!(
            folder_id = %id,
            new_parent_id = ?new_parent_id,
            subtree_size = subtree.len(),
            detached,
            attached,
            "Folder moved"
        );

        Ok(folder)
    }

    /// Share a folder with several users at once. Either every share is
    /// created or none is.
    pub async fn add_users(
        &self,
        folder_id: Uuid,
        users: &[(Uuid, FolderUserRole)],
    ) -> AppResult<Vec<FolderUser>> {
        let mut uow = self.backend.begin().await?;

        if uow.find_live(folder_id).await?.is_none() {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }

        let mut shares = Vec::with_capacity(users.len());
        for &(user_id, role) in users {
            let share = uow
                .add_user(&CreateFolderUser {
                    folder_id,
                    user_id,
                    role,
                })
                .await?;
            shares.push(share);
        }

        uow.commit().await?;

        info!(folder_id = %folder_id, users = shares.len(), "Folder shared");
        Ok(shares)
    }

    /// Delete a folder. Closure, membership, and share rows referencing it,
    /// as well as every subfolder, are removed by the storage cascade.
    pub async fn delete_folder(&self, id: Uuid) -> AppResult<bool> {
        let mut uow = self.backend.begin().await?;
        let deleted = uow.delete_folder(id).await?;
        uow.commit().await?;

        if deleted {
            info!(folder_id = %id, "Folder deleted");
        } else {
            debug!(folder_id = %id, "Folder to delete did not exist");
        }
        Ok(deleted)
    }

    async fn insert_edges(
        &self,
        uow: &mut dyn FolderUnitOfWork,
        edges: &[ClosureEdge],
    ) -> AppResult<u64> {
        let mut inserted = 0;
        for chunk in edges.chunks(self.batch_size) {
            inserted += uow.insert_edges(chunk).await?;
        }
        debug!(requested = edges.len(), inserted, "Closure rows inserted");
        Ok(inserted)
    }
}
