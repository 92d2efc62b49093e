use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anchor_config::OpQueueConfig;
use anchor_storage::{Store, StoreProvider, Tag, TIME_ADDED_TAG};
use anchor_types::{time::seconds_since_epoch, OperationMessage, QueuedOperation};
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use crate::{
    metrics::METRICS,
    pubsub::{Acker, Delivery, Message, PubSub},
    QueueError, INFLIGHT_STORE, OP_QUEUE_TOPIC, RETENTION_STORE,
};

/// A pending operation as seen by `peek`/`remove` callers.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationRef {
    pub operation: QueuedOperation,
    pub protocol_genesis_time: u64,
    pub time_added: DateTime<Utc>,
}

#[derive(Debug)]
struct PendingOperation {
    message: Message,
    operation: QueuedOperation,
    protocol_genesis_time: u64,
    time_added: DateTime<Utc>,
    acker: Acker,
}

impl PendingOperation {
    fn to_ref(&self) -> OperationRef {
        OperationRef {
            operation: self.operation.clone(),
            protocol_genesis_time: self.protocol_genesis_time,
            time_added: self.time_added,
        }
    }
}

#[derive(Debug)]
pub struct OperationQueue {
    pubsub: Arc<dyn PubSub>,
    inflight_store: Arc<dyn Store>,
    retention_store: Arc<dyn Store>,
    config: OpQueueConfig,
    pending: Mutex<VecDeque<PendingOperation>>,
    remove_guard: Arc<Mutex<()>>,
    started: AtomicBool,
}

impl OperationQueue {
    pub async fn new(
        pubsub: Arc<dyn PubSub>,
        provider: &dyn StoreProvider,
        config: OpQueueConfig,
    ) -> Result<Arc<Self>, QueueError> {
        let inflight_store = provider.open_store(INFLIGHT_STORE).await?;
        let retention_store = provider.open_store(RETENTION_STORE).await?;

        Ok(Arc::new(Self {
            pubsub,
            inflight_store,
            retention_store,
            config,
            pending: Mutex::new(VecDeque::new()),
            remove_guard: Arc::new(Mutex::new(())),
            started: AtomicBool::new(false),
        }))
    }

    /// Publishes an operation for at-least-once delivery and returns the
    /// current pending count. Fails only when the queue is not started
    /// or the publish itself fails.
    pub async fn add(
        &self,
        operation: QueuedOperation,
        protocol_genesis_time: u64,
    ) -> Result<usize, QueueError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(QueueError::NotStarted);
        }

        let wire = OperationMessage {
            operation,
            protocol_genesis_time,
        };
        let payload = serde_json::to_vec(&wire)
            .map_err(|e| QueueError::InvalidOperation(e.to_string()))?;

        self.pubsub
            .publish(OP_QUEUE_TOPIC, Message::new(payload))
            .await
            .map_err(QueueError::Publish)?;

        METRICS.added_ops.inc();
        Ok(self.pending.lock().await.len())
    }

    /// Returns up to `n` operations from the head of the pending buffer
    /// without removing them.
    pub async fn peek(&self, n: usize) -> Vec<OperationRef> {
        let pending = self.pending.lock().await;
        pending.iter().take(n).map(PendingOperation::to_ref).collect()
    }

    /// Removes up to `n` operations from the head of the pending buffer.
    /// The returned batch must be resolved with [`RemovedBatch::ack`] or
    /// [`RemovedBatch::nack`]; a second `remove` blocks until then.
    pub async fn remove(
        &self,
        n: usize,
    ) -> Result<(Vec<OperationRef>, RemovedBatch), QueueError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(QueueError::NotStarted);
        }

        let guard = Arc::clone(&self.remove_guard).lock_owned().await;

        let items: Vec<PendingOperation> = {
            let mut pending = self.pending.lock().await;
            let count = n.min(pending.len());
            let items = pending.drain(..count).collect();
            METRICS.pending_ops.set(pending.len());
            items
        };
        METRICS.removed_ops.inc_by(items.len() as u64);

        let refs = items.iter().map(PendingOperation::to_ref).collect();
        let batch = RemovedBatch {
            items,
            pubsub: Arc::clone(&self.pubsub),
            inflight_store: Arc::clone(&self.inflight_store),
            retention_store: Arc::clone(&self.retention_store),
            max_retries: self.config.max_retries,
            _guard: guard,
        };

        Ok((refs, batch))
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Runs the delivery loop. On stop, every in-flight pending item is
    /// nacked so a peer can pick it up, and the buffer is dropped.
    pub async fn run(
        self: Arc<Self>,
        mut stop_receiver: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut rx = self
            .pubsub
            .subscribe(OP_QUEUE_TOPIC, self.config.pool_size)
            .await
            .map_err(|e| anyhow::anyhow!("failed to subscribe to operation topic: {e}"))?;

        self.started.store(true, Ordering::SeqCst);

        while !*stop_receiver.borrow_and_update() {
            tokio::select! {
                delivery = rx.recv() => match delivery {
                    Some(delivery) => self.handle_delivery(delivery).await,
                    None => break,
                },
                _ = stop_receiver.changed() => break,
            }
        }

        self.started.store(false, Ordering::SeqCst);

        let drained: Vec<PendingOperation> = {
            let mut pending = self.pending.lock().await;
            METRICS.pending_ops.set(0);
            pending.drain(..).collect()
        };
        for item in drained {
            let _ = self.inflight_store.delete(&item.message.id).await;
            item.acker.nack();
        }

        tracing::info!("Stop signal received, operation queue is shutting down");
        Ok(())
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        let message = delivery.message;

        let wire: OperationMessage = match serde_json::from_slice(&message.payload) {
            Ok(wire) => wire,
            Err(err) => {
                // Not retryable: redelivering a malformed message can
                // never succeed.
                tracing::warn!("Dropping malformed operation message [{}]: {err}", message.id);
                METRICS.unmarshal_failures.inc();
                delivery.acker.ack();
                return;
            }
        };

        if let Err(err) = self
            .inflight_store
            .put(
                &message.id,
                &message.payload,
                &[Tag::new(TIME_ADDED_TAG, seconds_since_epoch().to_string())],
            )
            .await
        {
            tracing::warn!("Failed to snapshot in-flight operation [{}]: {err}", message.id);
        }

        let mut pending = self.pending.lock().await;
        pending.push_back(PendingOperation {
            operation: wire.operation,
            protocol_genesis_time: wire.protocol_genesis_time,
            time_added: Utc::now(),
            message,
            acker: delivery.acker,
        });
        METRICS.pending_ops.set(pending.len());
    }
}

/// Operations removed from the queue, pending final resolution.
#[derive(Debug)]
pub struct RemovedBatch {
    items: Vec<PendingOperation>,
    pubsub: Arc<dyn PubSub>,
    inflight_store: Arc<dyn Store>,
    retention_store: Arc<dyn Store>,
    max_retries: u32,
    _guard: OwnedMutexGuard<()>,
}

impl RemovedBatch {
    /// Commits every removed operation.
    pub async fn ack(self) {
        for item in &self.items {
            let _ = self.inflight_store.delete(&item.message.id).await;
        }
        for item in self.items {
            item.acker.ack();
        }
    }

    /// Repudiates every removed operation. Each is republished with an
    /// incremented retry counter, or dropped into the retention store
    /// once the counter exceeds the ceiling.
    pub async fn nack(self) {
        for item in self.items {
            let retries = item.message.retry_count();
            let _ = self.inflight_store.delete(&item.message.id).await;

            if retries >= self.max_retries {
                tracing::warn!(
                    "Dropping operation for suffix [{}] after {retries} retries",
                    item.operation.suffix
                );
                METRICS.dropped_ops.inc();

                if let Err(err) = self
                    .retention_store
                    .put(
                        &item.message.id,
                        &item.message.payload,
                        &[
                            Tag::new(TIME_ADDED_TAG, seconds_since_epoch().to_string()),
                            Tag::new("reason", "max-retries-exceeded"),
                        ],
                    )
                    .await
                {
                    tracing::error!(
                        "Failed to retain dropped operation [{}]: {err}",
                        item.message.id
                    );
                }

                item.acker.ack();
                continue;
            }

            METRICS.nacked_ops.inc();

            let mut message = item.message.clone();
            message.set_retry_count(retries + 1);
            match self.pubsub.publish(OP_QUEUE_TOPIC, message).await {
                Ok(()) => item.acker.ack(),
                Err(err) => {
                    // Fall back to broker-level redelivery with the old
                    // counter rather than losing the operation.
                    tracing::warn!(
                        "Failed to republish nacked operation [{}]: {err}",
                        item.message.id
                    );
                    item.acker.nack();
                }
            }
        }
    }
}
