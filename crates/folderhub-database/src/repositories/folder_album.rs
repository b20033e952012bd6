//! Folder ↔ album membership repository.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use folderhub_core::error::{AppError, ErrorKind};
use folderhub_core::result::AppResult;
use folderhub_entity::membership::{FolderAlbum, FolderAlbumPair};

use crate::store::{AlbumMembershipStore, zero_filled};

/// Repository for the `folder_albums` join table.
#[derive(Debug, Clone)]
pub struct FolderAlbumRepository {
    pool: PgPool,
}

impl FolderAlbumRepository {
    /// Create a new folder-album repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumMembershipStore for FolderAlbumRepository {
    async fn member_ids(&self, folder_id: Uuid, candidates: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT album_id FROM folder_albums WHERE folder_id = $1 AND album_id = ANY($2)",
        )
        .bind(folder_id)
        .bind(candidates)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read folder albums", e)
        })?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_pairs(&self, pairs: &[FolderAlbumPair]) -> AppResult<u64> {
        if pairs.is_empty() {
            return Ok(0);
        }

        let (folder_ids, album_ids): (Vec<Uuid>, Vec<Uuid>) =
            pairs.iter().map(|p| (p.folder_id, p.album_id)).unzip();

        let result = sqlx::query(
            "INSERT INTO folder_albums (folder_id, album_id) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[]) \
             ON CONFLICT DO NOTHING",
        )
        .bind(folder_ids)
        .bind(album_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add folder albums", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_members(&self, folder_id: Uuid, album_ids: &[Uuid]) -> AppResult<u64> {
        if album_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM folder_albums WHERE folder_id = $1 AND album_id = ANY($2)",
        )
        .bind(folder_id)
        .bind(album_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to remove folder albums", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn delete_from_all(&self, album_ids: &[Uuid]) -> AppResult<u64> {
        if album_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM folder_albums WHERE album_id = ANY($1)")
            .bind(album_ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to unlink albums", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn member_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        if folder_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) FROM folder_albums \
             WHERE folder_id = ANY($1) GROUP BY folder_id",
        )
        .bind(folder_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count folder albums", e)
        })?;

        Ok(zero_filled(
            folder_ids,
            rows.into_iter().map(|(id, count)| (id, count as u64)),
        ))
    }

    async fn list_members(&self, folder_id: Uuid) -> AppResult<Vec<FolderAlbum>> {
        sqlx::query_as::<_, FolderAlbum>(
            "SELECT * FROM folder_albums WHERE folder_id = $1 ORDER BY created_at DESC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list folder albums", e)
        })
    }
}
