//! Folder store configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the folder hierarchy and membership stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of rows written by a single batched insert
    /// (closure edges, album memberships).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl StoreConfig {
    /// Batch size clamped to at least one row.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    30_000
}
