//! Folder-album join rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An album filed into a folder. Flat set membership; no closure semantics.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FolderAlbum {
    /// The containing folder.
    pub folder_id: Uuid,
    /// The contained album.
    pub album_id: Uuid,
    /// When the album was added.
    pub created_at: DateTime<Utc>,
}

/// A `(folder, album)` pair to link in a cross-folder batch insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderAlbumPair {
    /// Target folder.
    pub folder_id: Uuid,
    /// Album to add.
    pub album_id: Uuid,
}

impl FolderAlbumPair {
    /// Create a pair.
    pub fn new(folder_id: Uuid, album_id: Uuid) -> Self {
        Self {
            folder_id,
            album_id,
        }
    }
}
