//! Folder tree structures for hierarchical display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Folder;

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: Uuid,
    /// Folder name.
    pub name: String,
    /// Depth below the tree root (0 for the root itself).
    pub depth: u32,
    /// Number of direct child folders.
    pub child_count: u64,
    /// Child folder nodes, ordered by name.
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Assemble a subtree from its root and the flat descendant list
    /// returned by a closure query. Folders whose parent is not part of the
    /// list are ignored.
    pub fn build(root: &Folder, descendants: &[Folder]) -> Self {
        let mut by_parent: HashMap<Uuid, Vec<&Folder>> = HashMap::new();
        for folder in descendants {
            if let Some(parent_id) = folder.parent_id {
                by_parent.entry(parent_id).or_default().push(folder);
            }
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Self::assemble(root, &by_parent, 0)
    }

    fn assemble(folder: &Folder, by_parent: &HashMap<Uuid, Vec<&Folder>>, depth: u32) -> Self {
        let children: Vec<FolderNode> = by_parent
            .get(&folder.id)
            .map(|kids| {
                kids.iter()
                    .map(|child| Self::assemble(child, by_parent, depth + 1))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: folder.id,
            name: folder.name.clone(),
            depth,
            child_count: children.len() as u64,
            children,
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> u64 {
        1 + self.children.iter().map(FolderNode::size).sum::<u64>()
    }
}
