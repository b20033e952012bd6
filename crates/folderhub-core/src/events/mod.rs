//! Domain events emitted by FolderHub operations.
//!
//! Events are handed to an [`EventNotifier`](crate::traits::EventNotifier)
//! after a mutation has been committed. Delivery is fire-and-forget.

pub mod folder;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use folder::FolderEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A folder-related event.
    Folder(FolderEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// Create a folder event caused by `actor_id`.
    pub fn folder(actor_id: Uuid, event: FolderEvent) -> Self {
        Self::new(Some(actor_id), EventPayload::Folder(event))
    }
}
