//! Folder share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::FolderUserRole;

/// A folder shared with a user. The owner never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FolderUser {
    /// The shared folder.
    pub folder_id: Uuid,
    /// The user the folder is shared with.
    pub user_id: Uuid,
    /// Granted role.
    pub role: FolderUserRole,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the role last changed.
    pub updated_at: DateTime<Utc>,
}

/// Data required to share a folder with a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderUser {
    /// The folder.
    pub folder_id: Uuid,
    /// The invited user.
    pub user_id: Uuid,
    /// Granted role.
    #[serde(default)]
    pub role: FolderUserRole,
}
