//! Port interface for event delivery

use async_trait::async_trait;
use warden_domain::Result;

/// Request/response client whose sends are dispatched by
/// [`AsyncDispatcher`](super::AsyncDispatcher).
#[async_trait]
pub trait EventClient: Send + Sync + 'static {
    /// Payload staged in the event buffer.
    type Event: Send + 'static;
    /// Value returned by the remote service for an accepted event.
    type Receipt: Send + 'static;

    async fn send_event(&self, event: Self::Event) -> Result<Self::Receipt>;
}
