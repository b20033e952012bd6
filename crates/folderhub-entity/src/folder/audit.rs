//! Folder deletion audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Record of a hard-deleted folder, written by the storage engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FolderAudit {
    /// Audit row ID.
    pub id: Uuid,
    /// The deleted folder.
    pub folder_id: Uuid,
    /// The owner of the deleted folder.
    pub user_id: Uuid,
    /// When the folder was deleted.
    pub deleted_at: DateTime<Utc>,
}
