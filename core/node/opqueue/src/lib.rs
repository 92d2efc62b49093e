//! At-least-once operation queue between DID operation submitters and
//! the batch writer.
//!
//! Operations are published to a durable pub/sub topic; the delivery
//! loop feeds a local pending buffer the writer drains with ack/nack
//! semantics. A nack republishes with an incremented retry counter;
//! beyond the retry ceiling the operation is dropped into the retention
//! store for operator inspection. A monitor task recovers in-flight
//! entries orphaned by a crashed node.

mod metrics;
mod monitor;
mod pubsub;
mod queue;

pub use self::{
    monitor::QueueMonitor,
    pubsub::{Acker, Delivery, MemPubSub, Message, PubSub, PubSubError, RETRY_COUNT_HEADER},
    queue::{OperationQueue, OperationRef, RemovedBatch},
};

use thiserror::Error;

use anchor_storage::StoreError;

/// Topic under which queued operations travel.
pub const OP_QUEUE_TOPIC: &str = "opqueue";

/// Name of the coordination store holding in-flight snapshots.
pub const INFLIGHT_STORE: &str = "opqueue";

/// Name of the store holding operations dropped after exhausting
/// retries.
pub const RETENTION_STORE: &str = "opqueue-retention";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("operation queue is not started")]
    NotStarted,

    #[error("failed to publish operation: {0}")]
    Publish(#[source] PubSubError),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    /// Publish failures of a started queue are transient: the broker is
    /// expected back.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Publish(_))
    }
}

#[cfg(test)]
mod tests;
