//! Per-id outcomes of bulk operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one id of a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkIdOutcome {
    /// The id was applied.
    Success,
    /// The id was already present (or repeated in the request).
    Duplicate,
    /// The caller may not act on the id.
    NoPermission,
    /// The id was not present.
    NotFound,
}

/// Result for one id of a bulk request, in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIdResult {
    /// The requested id.
    pub id: Uuid,
    /// What happened to it.
    pub outcome: BulkIdOutcome,
}

impl BulkIdResult {
    /// Create a result.
    pub fn new(id: Uuid, outcome: BulkIdOutcome) -> Self {
        Self { id, outcome }
    }

    /// Whether the id was applied.
    pub fn is_success(&self) -> bool {
        self.outcome == BulkIdOutcome::Success
    }
}

/// Ids that were applied, preserving request order.
pub fn successful_ids(results: &[BulkIdResult]) -> Vec<Uuid> {
    results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.id)
        .collect()
}
