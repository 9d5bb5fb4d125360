//! EventBus trait definition

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::CourierEvent;

/// Sequence number for events (monotonically increasing)
pub type EventSeq = u64;

/// Event bus for publishing and subscribing to CourierEvents
///
/// Implementations must support:
/// - Publishing events with sequence numbers
/// - Live subscriptions via broadcast channel
/// - Historical replay for late joiners
/// - Session-scoped event retrieval
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event, returns its sequence number
    async fn publish(&self, event: CourierEvent) -> EventSeq;

    /// Subscribe to all events from now (live stream)
    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, CourierEvent)>;

    /// Get retained events starting from a sequence number (for replay)
    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, CourierEvent)>;

    /// Get retained events for a specific session
    async fn get_session_events(&self, session_id: &str) -> Vec<(EventSeq, CourierEvent)>;

    /// Current sequence number (high water mark)
    fn current_seq(&self) -> EventSeq;
}
