//! Share revocation audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Record of a removed folder share, written by the storage engine.
///
/// Sync clients of `user_id` use these rows to drop folders they can no
/// longer see.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FolderUserAudit {
    /// Audit row ID.
    pub id: Uuid,
    /// The folder the share belonged to.
    pub folder_id: Uuid,
    /// The user who lost access.
    pub user_id: Uuid,
    /// When the share was removed.
    pub deleted_at: DateTime<Utc>,
}
