//! Folder repository implementation.
//!
//! Reads go straight to the pool; hierarchy mutations run inside a
//! [`PgUnitOfWork`] wrapping a single transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use folderhub_core::error::{AppError, ErrorKind};
use folderhub_core::result::AppResult;
use folderhub_entity::folder::{
    ClosureEdge, CreateFolder, Folder, FolderAudit, ParentFilter, UpdateFolder,
};
use folderhub_entity::share::{CreateFolderUser, FolderUser};

use super::folder_user::INSERT_SHARE;
use super::map_write_error;
use crate::store::{FolderBackend, FolderStore, FolderUnitOfWork, zero_filled};

/// Viewer may read the folder: owner or explicit share.
const VISIBLE_TO_VIEWER: &str = "(f.owner_id = $1 OR EXISTS ( \
    SELECT 1 FROM folder_users u WHERE u.folder_id = f.id AND u.user_id = $1))";

/// Bind `$2..=$6` of a folder update: name, description, thumbnail,
/// activity flag, asset order. `None` keeps the current value.
fn bind_changes<'q>(
    query: QueryAs<'q, Postgres, Folder, PgArguments>,
    changes: &'q UpdateFolder,
) -> QueryAs<'q, Postgres, Folder, PgArguments> {
    query
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.thumbnail_asset_id)
        .bind(changes.is_activity_enabled)
        .bind(changes.asset_order)
}

fn updated_row(
    id: Uuid,
    result: Result<Option<Folder>, sqlx::Error>,
    message: &'static str,
) -> AppResult<Folder> {
    result
        .map_err(|e| {
            map_write_error(e, message, || {
                "A folder with this name already exists here".to_string()
            })
        })?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
}

/// Repository for folder rows and closure-table queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        // Depth of an ancestor is the number of closure rows it descends from,
        // which stays correct after moves (creation time would not).
        sqlx::query_as::<_, Folder>(
            "SELECT f.* FROM folder_closure c \
             INNER JOIN folders f ON f.id = c.ancestor_id \
             WHERE c.descendant_id = $1 AND c.ancestor_id <> $1 AND f.deleted_at IS NULL \
             ORDER BY (SELECT COUNT(*) FROM folder_closure d WHERE d.descendant_id = f.id) ASC, \
                      f.created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find ancestors", e))
    }

    async fn find_descendants(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT f.* FROM folder_closure c \
             INNER JOIN folders f ON f.id = c.descendant_id \
             WHERE c.ancestor_id = $1 AND c.descendant_id <> $1 AND f.deleted_at IS NULL \
             ORDER BY f.name ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list descendants", e))
    }

    async fn find_children(&self, viewer_id: Uuid, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT f.* FROM folders f \
             WHERE f.parent_id = $2 AND f.deleted_at IS NULL AND {VISIBLE_TO_VIEWER} \
             ORDER BY f.name ASC"
        ))
        .bind(viewer_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    async fn find_roots(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NULL AND deleted_at IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list root folders", e))
    }

    async fn child_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        if folder_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT parent_id, COUNT(*) FROM folders \
             WHERE parent_id = ANY($1) AND deleted_at IS NULL \
             GROUP BY parent_id",
        )
        .bind(folder_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count children", e))?;

        Ok(zero_filled(
            folder_ids,
            rows.into_iter().map(|(id, count)| (id, count as u64)),
        ))
    }

    async fn find_owned(&self, owner_id: Uuid, parent: ParentFilter) -> AppResult<Vec<Folder>> {
        let query = match parent {
            ParentFilter::Any => sqlx::query_as::<_, Folder>(
                "SELECT * FROM folders WHERE owner_id = $1 AND deleted_at IS NULL \
                 ORDER BY created_at DESC",
            )
            .bind(owner_id),
            ParentFilter::Root => sqlx::query_as::<_, Folder>(
                "SELECT * FROM folders \
                 WHERE owner_id = $1 AND parent_id IS NULL AND deleted_at IS NULL \
                 ORDER BY created_at DESC",
            )
            .bind(owner_id),
            ParentFilter::Parent(parent_id) => sqlx::query_as::<_, Folder>(
                "SELECT * FROM folders \
                 WHERE owner_id = $1 AND parent_id = $2 AND deleted_at IS NULL \
                 ORDER BY created_at DESC",
            )
            .bind(owner_id)
            .bind(parent_id),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    async fn find_shared(&self, user_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT f.* FROM folders f \
             WHERE f.deleted_at IS NULL AND ( \
                 (f.owner_id = $1 AND EXISTS (SELECT 1 FROM folder_users u WHERE u.folder_id = f.id)) \
                 OR EXISTS (SELECT 1 FROM folder_users u WHERE u.folder_id = f.id AND u.user_id = $1) \
             ) \
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list shared folders", e)
        })
    }

    async fn find_not_shared(&self, owner_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT f.* FROM folders f \
             WHERE f.owner_id = $1 AND f.deleted_at IS NULL \
               AND NOT EXISTS (SELECT 1 FROM folder_users u WHERE u.folder_id = f.id) \
             ORDER BY f.created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list unshared folders", e)
        })
    }

    async fn find_by_album(&self, viewer_id: Uuid, album_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT f.* FROM folders f \
             INNER JOIN folder_albums fa ON fa.folder_id = f.id \
             WHERE fa.album_id = $2 AND f.deleted_at IS NULL AND {VISIBLE_TO_VIEWER} \
             ORDER BY f.created_at DESC"
        ))
        .bind(viewer_id)
        .bind(album_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list folders by album", e)
        })
    }

    async fn closure_edges(&self, folder_id: Uuid) -> AppResult<Vec<ClosureEdge>> {
        sqlx::query_as::<_, ClosureEdge>(
            "SELECT ancestor_id, descendant_id FROM folder_closure \
             WHERE ancestor_id = $1 OR descendant_id = $1 \
             ORDER BY ancestor_id, descendant_id",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list closure rows", e))
    }

    async fn update(&self, id: Uuid, changes: &UpdateFolder) -> AppResult<Folder> {
        let query = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                thumbnail_asset_id = COALESCE($4, thumbnail_asset_id), \
                is_activity_enabled = COALESCE($5, is_activity_enabled), \
                asset_order = COALESCE($6, asset_order), \
                updated_at = NOW(), \
                update_id = $7 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id);
        let updated = bind_changes(query, changes)
            .bind(Uuid::now_v7())
            .fetch_optional(&self.pool)
            .await;
        updated_row(id, updated, "Failed to update folder")
    }

    async fn touch(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE folders SET updated_at = NOW(), update_id = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Uuid::now_v7())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch folder", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        }
        Ok(())
    }

    async fn soft_delete_all(&self, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET deleted_at = NOW(), updated_at = NOW(), update_id = $2 \
             WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .bind(Uuid::now_v7())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to soft-delete folders", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn restore_all(&self, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE folders SET deleted_at = NULL, updated_at = NOW(), update_id = $2 \
             WHERE owner_id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(owner_id)
        .bind(Uuid::now_v7())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, "Failed to restore folders", || {
                "A restored folder clashes with a live folder of the same name".to_string()
            })
        })?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete folders", e))?;
        Ok(result.rows_affected())
    }

    async fn find_deleted_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FolderAudit>> {
        sqlx::query_as::<_, FolderAudit>(
            "SELECT * FROM folder_audit WHERE user_id = $1 AND deleted_at > $2 \
             ORDER BY deleted_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folder audit", e))
    }
}

#[async_trait]
impl FolderBackend for FolderRepository {
    async fn begin(&self) -> AppResult<Box<dyn FolderUnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A hierarchy unit of work backed by one PostgreSQL transaction.
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FolderUnitOfWork for PgUnitOfWork {
    async fn find_live(&mut self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn insert_folder(&mut self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (owner_id, name, description, parent_id, asset_order, update_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.parent_id)
        .bind(data.asset_order)
        .bind(Uuid::now_v7())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            map_write_error(e, "Failed to create folder", || {
                format!("Folder '{}' already exists here", data.name)
            })
        })
    }

    async fn ancestor_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT ancestor_id FROM folder_closure WHERE descendant_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read ancestors", e))
    }

    async fn descendant_ids(&mut self, id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT descendant_id FROM folder_closure WHERE ancestor_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read descendants", e))
    }

    async fn insert_edges(&mut self, edges: &[ClosureEdge]) -> AppResult<u64> {
        if edges.is_empty() {
            return Ok(0);
        }

        let (ancestors, descendants): (Vec<Uuid>, Vec<Uuid>) = edges
            .iter()
            .map(|e| (e.ancestor_id, e.descendant_id))
            .unzip();

        let result = sqlx::query(
            "INSERT INTO folder_closure (ancestor_id, descendant_id) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(ancestors)
        .bind(descendants)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert closure rows", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn detach_subtree(&mut self, subtree: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM folder_closure \
             WHERE descendant_id = ANY($1) AND NOT (ancestor_id = ANY($1))",
        )
        .bind(subtree)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to detach subtree", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn set_parent(
        &mut self,
        id: Uuid,
        parent_id: Option<Uuid>,
        changes: &UpdateFolder,
    ) -> AppResult<Folder> {
        let query = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                thumbnail_asset_id = COALESCE($4, thumbnail_asset_id), \
                is_activity_enabled = COALESCE($5, is_activity_enabled), \
                asset_order = COALESCE($6, asset_order), \
                updated_at = NOW(), \
                update_id = $7, \
                parent_id = $8 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id);
        let moved = bind_changes(query, changes)
            .bind(Uuid::now_v7())
            .bind(parent_id)
            .fetch_optional(&mut *self.tx)
            .await;
        updated_row(id, moved, "Failed to move folder")
    }

    async fn delete_folder(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete folder", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_albums(&mut self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64> {
        if album_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "INSERT INTO folder_albums (folder_id, album_id) \
             SELECT $1, album_id FROM UNNEST($2::uuid[]) AS t(album_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(folder_id)
        .bind(album_ids)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to link albums", e))?;
        Ok(result.rows_affected())
    }

    async fn add_user(&mut self, data: &CreateFolderUser) -> AppResult<FolderUser> {
        sqlx::query_as::<_, FolderUser>(INSERT_SHARE)
            .bind(data.folder_id)
            .bind(data.user_id)
            .bind(data.role)
            .bind(Uuid::now_v7())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| {
                map_write_error(e, "Failed to share folder", || {
                    format!("Folder is already shared with user {}", data.user_id)
                })
            })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }
}
