//! Folder share role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role granted to a user a folder is shared with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "folder_user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FolderUserRole {
    /// May add and remove albums.
    #[default]
    Editor,
    /// Read-only access.
    Viewer,
}

impl FolderUserRole {
    /// Whether the role allows changing folder contents.
    pub fn can_edit(&self) -> bool {
        matches!(self, Self::Editor)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for FolderUserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderUserRole {
    type Err = folderhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            _ => Err(folderhub_core::AppError::validation(format!(
                "Invalid folder role: '{s}'. Expected one of: editor, viewer"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "editor".parse::<FolderUserRole>().unwrap(),
            FolderUserRole::Editor
        );
        assert_eq!(
            "VIEWER".parse::<FolderUserRole>().unwrap(),
            FolderUserRole::Viewer
        );
        assert!("owner".parse::<FolderUserRole>().is_err());
    }

    #[test]
    fn test_can_edit() {
        assert!(FolderUserRole::Editor.can_edit());
        assert!(!FolderUserRole::Viewer.can_edit());
    }
}
