//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::order::AssetOrder;

/// Name given to folders created without one.
pub const DEFAULT_FOLDER_NAME: &str = "Untitled Folder";

/// A folder in an owner's hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The folder owner.
    pub owner_id: Uuid,
    /// Folder name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<Uuid>,
    /// Asset used as the folder's cover image.
    pub thumbnail_asset_id: Option<Uuid>,
    /// Whether comments/likes are enabled on the folder.
    pub is_activity_enabled: bool,
    /// Display order of assets inside the folder.
    pub asset_order: AssetOrder,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp; soft-deleted folders are hidden from queries.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Monotonic (UUIDv7) token regenerated on every update, for sync.
    pub update_id: Uuid,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if the folder has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The folder owner.
    pub owner_id: Uuid,
    /// Folder name.
    pub name: String,
    /// Description (empty when not given).
    #[serde(default)]
    pub description: String,
    /// Parent folder (None for root).
    pub parent_id: Option<Uuid>,
    /// Asset display order.
    #[serde(default)]
    pub asset_order: AssetOrder,
}

impl CreateFolder {
    /// A root-level folder with default attributes.
    pub fn root(owner_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
            description: String::new(),
            parent_id: None,
            asset_order: AssetOrder::default(),
        }
    }

    /// A folder nested under `parent_id` with default attributes.
    pub fn child(owner_id: Uuid, parent_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::root(owner_id, name)
        }
    }
}

/// Attribute changes for an existing folder. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFolder {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New thumbnail asset.
    pub thumbnail_asset_id: Option<Uuid>,
    /// Enable or disable activity.
    pub is_activity_enabled: Option<bool>,
    /// New asset order.
    pub asset_order: Option<AssetOrder>,
}

impl UpdateFolder {
    /// Whether no attribute would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.thumbnail_asset_id.is_none()
            && self.is_activity_enabled.is_none()
            && self.asset_order.is_none()
    }

    /// Apply the changes to an in-memory folder row.
    pub fn apply_to(&self, folder: &mut Folder) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(description) = &self.description {
            folder.description = description.clone();
        }
        if let Some(thumbnail) = self.thumbnail_asset_id {
            folder.thumbnail_asset_id = Some(thumbnail);
        }
        if let Some(enabled) = self.is_activity_enabled {
            folder.is_activity_enabled = enabled;
        }
        if let Some(order) = self.asset_order {
            folder.asset_order = order;
        }
    }
}

/// Which level of an owner's hierarchy to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentFilter {
    /// Every folder regardless of position.
    #[default]
    Any,
    /// Only folders without a parent.
    Root,
    /// Only direct children of the given folder.
    Parent(Uuid),
}

impl ParentFilter {
    /// Build a filter from an optional/nullable parent id as sent by clients:
    /// absent means any, explicit null means root.
    pub fn from_request(parent_id: Option<Option<Uuid>>) -> Self {
        match parent_id {
            None => Self::Any,
            Some(None) => Self::Root,
            Some(Some(id)) => Self::Parent(id),
        }
    }

    /// Whether a folder with the given parent matches this filter.
    pub fn matches(&self, parent_id: Option<Uuid>) -> bool {
        match self {
            Self::Any => true,
            Self::Root => parent_id.is_none(),
            Self::Parent(id) => parent_id == Some(*id),
        }
    }
}
