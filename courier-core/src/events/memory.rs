//! In-memory EventBus implementation
//!
//! MemoryEventBus keeps a bounded window of recent events for replay and uses
//! a broadcast channel for live subscribers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use super::CourierEvent;
use super::bus::{EventBus, EventSeq};

/// Events retained for replay when no explicit limit is given
const DEFAULT_RETENTION: usize = 10_000;

/// In-memory implementation of EventBus
pub struct MemoryEventBus {
    /// Retained events, oldest first
    events: RwLock<VecDeque<(EventSeq, CourierEvent)>>,
    /// Next sequence number to assign
    next_seq: AtomicU64,
    /// Maximum number of retained events
    retention: usize,
    /// Broadcast channel for live subscribers
    tx: broadcast::Sender<(EventSeq, CourierEvent)>,
}

impl MemoryEventBus {
    /// Create a new MemoryEventBus with the given broadcast channel capacity
    pub fn new(capacity: usize) -> Self {
        Self::with_retention(capacity, DEFAULT_RETENTION)
    }

    /// Create a bus that retains at most `retention` events for replay
    pub fn with_retention(capacity: usize, retention: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            events: RwLock::new(VecDeque::new()),
            next_seq: AtomicU64::new(0),
            retention,
            tx,
        }
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: CourierEvent) -> EventSeq {
        let mut events = self.events.write().await;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        events.push_back((seq, event.clone()));
        while events.len() > self.retention {
            events.pop_front();
        }
        drop(events);

        // No receivers is fine
        let _ = self.tx.send((seq, event));

        seq
    }

    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, CourierEvent)> {
        self.tx.subscribe()
    }

    async fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, CourierEvent)> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(s, _)| *s >= seq)
            .cloned()
            .collect()
    }

    async fn get_session_events(&self, session_id: &str) -> Vec<(EventSeq, CourierEvent)> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(_, event)| event.session_id() == session_id)
            .cloned()
            .collect()
    }

    fn current_seq(&self) -> EventSeq {
        self.next_seq.load(Ordering::SeqCst)
    }
}
