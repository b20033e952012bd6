//! In-process event bus for single-node deployments.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use folderhub_core::events::DomainEvent;
use folderhub_core::result::AppResult;
use folderhub_core::traits::EventNotifier;

/// Broadcasts domain events to every in-process subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventNotifier for EventBus {
    async fn emit(&self, event: DomainEvent) -> AppResult<()> {
        // No subscribers is not a failure.
        if self.sender.send(event).is_err() {
            debug!("Domain event dropped, no subscribers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use folderhub_core::events::{EventPayload, FolderEvent};
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let folder_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        bus.emit(DomainEvent::folder(
            Uuid::new_v4(),
            FolderEvent::Invited { folder_id, user_id },
        ))
        .await
        .unwrap();

        let received = rx.recv().await.unwrap();
        match received.payload {
            EventPayload::Folder(event) => assert_eq!(event.recipient_id(), user_id),
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_succeeds() {
        let bus = EventBus::new(1);
        let event = DomainEvent::folder(
            Uuid::new_v4(),
            FolderEvent::Updated {
                folder_id: Uuid::new_v4(),
                recipient_id: Uuid::new_v4(),
            },
        );
        assert!(bus.emit(event).await.is_ok());
    }
}
