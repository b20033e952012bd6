//! Request and response types of the folder service.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use folderhub_core::error::AppError;
use folderhub_entity::bulk::BulkIdOutcome;
use folderhub_entity::folder::{AssetOrder, Folder, ParentFilter, UpdateFolder};
use folderhub_entity::membership::FolderAlbum;
use folderhub_entity::share::{FolderUser, FolderUserRole};

/// Validate a request, mapping failures to a `Validation` error.
pub(crate) fn validated<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}

fn not_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Distinguish an absent field (`None`) from an explicit null (`Some(None)`).
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// A user to share a folder with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FolderUserInput {
    /// The invited user.
    pub user_id: Uuid,
    /// Granted role.
    #[serde(default)]
    pub role: FolderUserRole,
}

/// Request to create a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name; blank or missing names get the default name.
    #[validate(length(max = 255))]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Parent folder (None for a root folder).
    pub parent_id: Option<Uuid>,
    /// Albums to file into the new folder; unreadable albums are skipped.
    #[serde(default)]
    pub album_ids: Vec<Uuid>,
    /// Users to share the new folder with.
    #[serde(default)]
    pub users: Vec<FolderUserInput>,
}

/// Request to change a folder's attributes and/or parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFolderRequest {
    /// New name; surrounding whitespace is dropped.
    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New thumbnail asset.
    pub thumbnail_asset_id: Option<Uuid>,
    /// Enable or disable activity.
    pub is_activity_enabled: Option<bool>,
    /// New asset order.
    pub asset_order: Option<AssetOrder>,
    /// New parent: absent keeps the parent, null moves to the root.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
}

impl UpdateFolderRequest {
    /// The attribute part of the request.
    pub fn changes(&self) -> UpdateFolder {
        UpdateFolder {
            name: self.name.as_deref().map(|name| name.trim().to_string()),
            description: self.description.clone(),
            thumbnail_asset_id: self.thumbnail_asset_id,
            is_activity_enabled: self.is_activity_enabled,
            asset_order: self.asset_order,
        }
    }
}

/// Which folders to list. Checked in field order: album, shared flag, parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFoldersQuery {
    /// Only folders containing this album.
    pub album_id: Option<Uuid>,
    /// `true`: shared by or with me; `false`: owned and not shared.
    pub shared: Option<bool>,
    /// Parent level of owned folders: absent means all, null means roots.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
}

impl ListFoldersQuery {
    /// Parent filter for owned-folder listings.
    pub fn parent_filter(&self) -> ParentFilter {
        ParentFilter::from_request(self.parent_id)
    }
}

/// A list of ids for a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkIdsRequest {
    /// Target ids.
    #[validate(length(min = 1))]
    pub ids: Vec<Uuid>,
}

/// Request to file albums into several folders.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddAlbumsToFoldersRequest {
    /// Target folders.
    #[validate(length(min = 1))]
    pub folder_ids: Vec<Uuid>,
    /// Albums to add to each folder.
    #[validate(length(min = 1))]
    pub album_ids: Vec<Uuid>,
}

/// Aggregate outcome of filing albums into several folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAlbumsToFoldersResponse {
    /// Whether at least one album was added somewhere.
    pub success: bool,
    /// Why nothing was added.
    pub error: Option<BulkIdOutcome>,
}

/// Request to share a folder with users.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddUsersRequest {
    /// Users to add.
    #[validate(length(min = 1))]
    pub users: Vec<FolderUserInput>,
}

/// Request to change a shared user's role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateFolderUserRequest {
    /// New role.
    pub role: FolderUserRole,
}

/// Whose share to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTarget {
    /// The acting user.
    Me,
    /// Another user.
    User(Uuid),
}

impl UserTarget {
    /// Resolve to a user id.
    pub fn resolve(self, actor_id: Uuid) -> Uuid {
        match self {
            Self::Me => actor_id,
            Self::User(id) => id,
        }
    }
}

/// Folder counts for the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStatistics {
    /// Folders the user owns.
    pub owned: u64,
    /// Folders shared by or with the user.
    pub shared: u64,
    /// Owned folders without shares.
    pub not_shared: u64,
}

/// A folder in a listing, decorated with counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSummary {
    /// The folder row.
    #[serde(flatten)]
    pub folder: Folder,
    /// Number of albums filed in the folder.
    pub album_count: u64,
    /// Number of direct subfolders.
    pub subfolder_count: u64,
}

/// A single folder with its albums, shares, and breadcrumb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderDetails {
    /// The folder row.
    #[serde(flatten)]
    pub folder: Folder,
    /// Albums filed in the folder, newest first.
    pub albums: Vec<FolderAlbum>,
    /// Users the folder is shared with.
    pub shares: Vec<FolderUser>,
    /// Ancestors from the root down to the parent.
    pub ancestors: Vec<Folder>,
}
