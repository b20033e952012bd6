//! Event/notification collaborator.

use async_trait::async_trait;

use crate::events::DomainEvent;
use crate::result::AppResult;

/// Receives domain events after a mutation has been committed.
///
/// Errors returned here are reported by the caller but never undo the
/// mutation that produced the event.
#[async_trait]
pub trait EventNotifier: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver an event.
    async fn emit(&self, event: DomainEvent) -> AppResult<()>;
}
