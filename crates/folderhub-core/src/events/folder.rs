//! Folder-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to folder sharing and content changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FolderEvent {
    /// A user was invited to (shared on) a folder.
    Invited {
        /// The folder ID.
        folder_id: Uuid,
        /// The invited user.
        user_id: Uuid,
    },
    /// The folder's content changed; sent once per interested user.
    Updated {
        /// The folder ID.
        folder_id: Uuid,
        /// The user who should be told.
        recipient_id: Uuid,
    },
}

impl FolderEvent {
    /// The folder this event is about.
    pub fn folder_id(&self) -> Uuid {
        match self {
            Self::Invited { folder_id, .. } | Self::Updated { folder_id, .. } => *folder_id,
        }
    }

    /// The user this event is addressed to.
    pub fn recipient_id(&self) -> Uuid {
        match self {
            Self::Invited { user_id, .. } => *user_id,
            Self::Updated { recipient_id, .. } => *recipient_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let folder_id = Uuid::nil();
        let event = FolderEvent::Invited {
            folder_id,
            user_id: folder_id,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Invited");
        assert_eq!(event.recipient_id(), folder_id);
    }
}
