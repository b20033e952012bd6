//! Closure table rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of the folder transitive-closure table.
///
/// `(a, d)` exists iff `a == d` or `a` is a (transitive) parent of `d`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, FromRow,
)]
pub struct ClosureEdge {
    /// The ancestor (or the folder itself for the reflexive row).
    pub ancestor_id: Uuid,
    /// The descendant.
    pub descendant_id: Uuid,
}

impl ClosureEdge {
    /// Create an edge.
    pub fn new(ancestor_id: Uuid, descendant_id: Uuid) -> Self {
        Self {
            ancestor_id,
            descendant_id,
        }
    }

    /// The reflexive row every folder owns.
    pub fn reflexive(folder_id: Uuid) -> Self {
        Self::new(folder_id, folder_id)
    }

    /// Whether this is a reflexive row.
    pub fn is_reflexive(&self) -> bool {
        self.ancestor_id == self.descendant_id
    }

    /// Whether the row mentions `folder_id` on either side.
    pub fn touches(&self, folder_id: Uuid) -> bool {
        self.ancestor_id == folder_id || self.descendant_id == folder_id
    }

    /// Every `(ancestor, descendant)` pair of the cross product.
    pub fn cross(ancestors: &[Uuid], descendants: &[Uuid]) -> Vec<Self> {
        ancestors
            .iter()
            .flat_map(|&a| descendants.iter().map(move |&d| Self::new(a, d)))
            .collect()
    }
}
