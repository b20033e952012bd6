//! Access control derived from folder ownership and shares.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use folderhub_core::result::AppResult;
use folderhub_core::traits::{AccessChecker, Permission};
use folderhub_database::store::{FolderStore, FolderUserStore};
use folderhub_entity::share::FolderUserRole;

/// [`AccessChecker`] that grants folder permissions from ownership and
/// share roles.
///
/// | permission       | owner | editor | viewer |
/// |------------------|-------|--------|--------|
/// | `FolderRead`     | yes   | yes    | yes    |
/// | `FolderUpdate`   | yes   | yes    | no     |
/// | `FolderDelete`   | yes   | no     | no     |
/// | `FolderShare`    | yes   | no     | no     |
///
/// Albums and assets live outside the folder store, so `AlbumRead` and
/// `AssetRead` are granted for every id.
#[derive(Debug, Clone)]
pub struct OwnershipAccessChecker {
    folders: Arc<dyn FolderStore>,
    shares: Arc<dyn FolderUserStore>,
}

impl OwnershipAccessChecker {
    /// Create a checker over the folder and share stores.
    pub fn new(folders: Arc<dyn FolderStore>, shares: Arc<dyn FolderUserStore>) -> Self {
        Self { folders, shares }
    }

    async fn allows(&self, actor_id: Uuid, permission: Permission, folder_id: Uuid) -> AppResult<bool> {
        let Some(folder) = self.folders.find_by_id(folder_id).await? else {
            return Ok(false);
        };
        if folder.owner_id == actor_id {
            return Ok(true);
        }

        let role = self
            .shares
            .find(folder_id, actor_id)
            .await?
            .map(|share| share.role);
        Ok(match (permission, role) {
            (Permission::FolderRead, Some(_)) => true,
            (Permission::FolderUpdate, Some(FolderUserRole::Editor)) => true,
            _ => false,
        })
    }
}

#[async_trait]
impl AccessChecker for OwnershipAccessChecker {
    async fn check(
        &self,
        actor_id: Uuid,
        permission: Permission,
        ids: &HashSet<Uuid>,
    ) -> AppResult<HashSet<Uuid>> {
        match permission {
            Permission::AlbumRead | Permission::AssetRead => Ok(ids.clone()),
            _ => {
                let mut allowed = HashSet::with_capacity(ids.len());
                for &id in ids {
                    if self.allows(actor_id, permission, id).await? {
                        allowed.insert(id);
                    }
                }
                Ok(allowed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use folderhub_core::config::StoreConfig;
    use folderhub_core::error::ErrorKind;
    use folderhub_database::{ClosureMaintainer, MemoryStore};
    use folderhub_entity::folder::CreateFolder;
    use folderhub_entity::share::CreateFolderUser;

    use super::*;

    #[tokio::test]
    async fn test_roles_map_to_permissions() {
        let store = MemoryStore::new();
        let maintainer = ClosureMaintainer::new(Arc::new(store.clone()), &StoreConfig::default());
        let checker = OwnershipAccessChecker::new(Arc::new(store.clone()), Arc::new(store.clone()));

        let owner = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let folder = maintainer
            .create_folder_with_members(
                &CreateFolder::root(owner, "f"),
                &[],
                &[(editor, FolderUserRole::Editor), (viewer, FolderUserRole::Viewer)],
            )
            .await
            .unwrap()
            .id;

        for user in [owner, editor, viewer] {
            checker.require(user, Permission::FolderRead, &[folder]).await.unwrap();
        }
        checker.require(editor, Permission::FolderUpdate, &[folder]).await.unwrap();

        let err = checker
            .require(viewer, Permission::FolderUpdate, &[folder])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert!(checker.require(editor, Permission::FolderShare, &[folder]).await.is_err());
        assert!(checker.require(stranger, Permission::FolderRead, &[folder]).await.is_err());
        assert!(checker.require(owner, Permission::FolderDelete, &[folder]).await.is_ok());

        // Unknown folders are never granted.
        let missing = Uuid::new_v4();
        let wanted: HashSet<Uuid> = [folder, missing].into_iter().collect();
        let allowed = checker.check(owner, Permission::FolderRead, &wanted).await.unwrap();
        assert_eq!(allowed, [folder].into_iter().collect());

        // Share rows are only about folders the user does not own.
        store
            .create(&CreateFolderUser {
                folder_id: folder,
                user_id: stranger,
                role: FolderUserRole::Viewer,
            })
            .await
            .unwrap();
        assert!(checker.require(stranger, Permission::FolderRead, &[folder]).await.is_ok());
    }
}
