//! Folder share repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use folderhub_core::error::{AppError, ErrorKind};
use folderhub_core::result::AppResult;
use folderhub_entity::share::{CreateFolderUser, FolderUser, FolderUserAudit, FolderUserRole};

use super::map_write_error;
use crate::store::FolderUserStore;

/// Insert a share and bump the folder's update token in one statement.
pub(crate) const INSERT_SHARE: &str = "WITH inserted AS ( \
        INSERT INTO folder_users (folder_id, user_id, role) VALUES ($1, $2, $3) RETURNING * \
    ), touched AS ( \
        UPDATE folders SET updated_at = NOW(), update_id = $4 WHERE id = $1 \
    ) \
    SELECT * FROM inserted";

/// Repository for the `folder_users` table.
#[derive(Debug, Clone)]
pub struct FolderUserRepository {
    pool: PgPool,
}

impl FolderUserRepository {
    /// Create a new folder-user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderUserStore for FolderUserRepository {
    async fn create(&self, data: &CreateFolderUser) -> AppResult<FolderUser> {
        sqlx::query_as::<_, FolderUser>(INSERT_SHARE)
            .bind(data.folder_id)
            .bind(data.user_id)
            .bind(data.role)
            .bind(Uuid::now_v7())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(e, "Failed to share folder", || {
                    format!("Folder is already shared with user {}", data.user_id)
                })
            })
    }

    async fn update_role(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        role: FolderUserRole,
    ) -> AppResult<FolderUser> {
        sqlx::query_as::<_, FolderUser>(
            "UPDATE folder_users SET role = $3, updated_at = NOW() \
             WHERE folder_id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(folder_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update share", e))?
        .ok_or_else(|| AppError::not_found("Folder is not shared with this user"))
    }

    async fn delete(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM folder_users WHERE folder_id = $1 AND user_id = $2")
            .bind(folder_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to remove share", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Option<FolderUser>> {
        sqlx::query_as::<_, FolderUser>(
            "SELECT * FROM folder_users WHERE folder_id = $1 AND user_id = $2",
        )
        .bind(folder_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share", e))
    }

    async fn list_for_folder(&self, folder_id: Uuid) -> AppResult<Vec<FolderUser>> {
        sqlx::query_as::<_, FolderUser>(
            "SELECT * FROM folder_users WHERE folder_id = $1 ORDER BY created_at ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list shares", e))
    }

    async fn find_removed_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderUserAudit>> {
        sqlx::query_as::<_, FolderUserAudit>(
            "SELECT * FROM folder_user_audit WHERE user_id = $1 AND deleted_at > $2 \
             ORDER BY deleted_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list share audit", e))
    }
}
