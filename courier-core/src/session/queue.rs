//! Outbound queue and delivery records

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Outcome of a delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Not yet attempted
    Pending,
    /// Accepted by the connection
    Sent,
    /// Rejected; never retried
    Failed { error: String },
}

/// A message waiting for delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    /// Normalized destination address
    pub destination: String,
    pub payload: String,
    pub status: AttemptStatus,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedMessage {
    pub fn new(destination: String, payload: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            destination,
            payload,
            status: AttemptStatus::Pending,
            enqueued_at: Utc::now(),
        }
    }
}

/// FIFO of pending messages, optionally bounded
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` items (0 = unbounded)
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Append to the tail, returning the new length
    pub fn push(&mut self, message: QueuedMessage) -> Result<usize, SessionError> {
        if self.capacity > 0 && self.items.len() >= self.capacity {
            return Err(SessionError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.items.push_back(message);
        Ok(self.items.len())
    }

    /// Remove the head
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything still pending, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}

/// Record of one finished delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub message_id: String,
    pub destination: String,
    #[serde(flatten)]
    pub status: AttemptStatus,
    pub enqueued_at: DateTime<Utc>,
    pub attempted_at: DateTime<Utc>,
    /// False for direct sends that bypassed the queue
    pub queued: bool,
}

/// Bounded ring of recent delivery records, oldest first
#[derive(Debug)]
pub struct DeliveryLog {
    records: VecDeque<DeliveryRecord>,
    limit: usize,
}

impl DeliveryLog {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    pub fn record(&mut self, record: DeliveryRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn snapshot(&self) -> Vec<DeliveryRecord> {
        self.records.iter().cloned().collect()
    }
}
