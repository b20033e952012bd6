//! Access-control collaborator.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

/// Actions that can be checked against a set of resource ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read a folder and its listings.
    FolderRead,
    /// Change a folder's attributes, parent, or albums.
    FolderUpdate,
    /// Delete a folder.
    FolderDelete,
    /// Manage a folder's shared users.
    FolderShare,
    /// Read an album (required to file it into a folder).
    AlbumRead,
    /// Read an asset (required to use it as a thumbnail).
    AssetRead,
}

impl Permission {
    /// Return the permission as a dotted string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FolderRead => "folder.read",
            Self::FolderUpdate => "folder.update",
            Self::FolderDelete => "folder.delete",
            Self::FolderShare => "folder.share",
            Self::AlbumRead => "album.read",
            Self::AssetRead => "asset.read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides which resources an actor may act on.
///
/// Given `(actor, permission, ids)` an implementation returns the subset of
/// `ids` the actor is allowed to use. Unknown ids are simply not returned.
#[async_trait]
pub trait AccessChecker: Send + Sync + fmt::Debug + 'static {
    /// Return the allowed subset of `ids`.
    async fn check(
        &self,
        actor_id: Uuid,
        permission: Permission,
        ids: &HashSet<Uuid>,
    ) -> AppResult<HashSet<Uuid>>;

    /// Fail with [`ErrorKind::Authorization`](crate::ErrorKind::Authorization)
    /// unless every id is allowed.
    async fn require(&self, actor_id: Uuid, permission: Permission, ids: &[Uuid]) -> AppResult<()> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let allowed = self.check(actor_id, permission, &wanted).await?;
        if wanted.is_subset(&allowed) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "Not found or no {permission} access"
            )))
        }
    }
}
