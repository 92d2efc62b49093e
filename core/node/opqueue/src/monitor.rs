use std::sync::Arc;

use anchor_config::OpQueueConfig;
use anchor_storage::{Store, StoreProvider, TagExpr, TIME_ADDED_TAG};
use anchor_types::time::seconds_since_epoch;

use crate::{
    metrics::METRICS,
    pubsub::{Message, PubSub},
    QueueError, INFLIGHT_STORE, OP_QUEUE_TOPIC,
};

/// Recovers operations whose owning node died mid-batch: in-flight
/// snapshots older than the expiry threshold are republished to the live
/// topic. Registered as a coordinated task so one node per cluster runs
/// the scan.
#[derive(Debug)]
pub struct QueueMonitor {
    inflight_store: Arc<dyn Store>,
    pubsub: Arc<dyn PubSub>,
    config: OpQueueConfig,
}

impl QueueMonitor {
    pub async fn new(
        pubsub: Arc<dyn PubSub>,
        provider: &dyn StoreProvider,
        config: OpQueueConfig,
    ) -> Result<Self, QueueError> {
        let inflight_store = provider.open_store(INFLIGHT_STORE).await?;
        Ok(Self {
            inflight_store,
            pubsub,
            config,
        })
    }

    /// Republishes every orphaned in-flight entry; returns how many were
    /// recovered.
    pub async fn check_once(&self) -> Result<usize, QueueError> {
        let cutoff = seconds_since_epoch().saturating_sub(self.config.inflight_expiry_secs);

        let mut iter = self
            .inflight_store
            .query(&[TagExpr::with_name(TIME_ADDED_TAG)])
            .await?;

        let mut orphaned = Vec::new();
        while let Some(record) = iter.next().await? {
            let time_added = record
                .tags
                .iter()
                .find(|tag| tag.name == TIME_ADDED_TAG)
                .and_then(|tag| tag.value.parse::<u64>().ok());
            if time_added.map_or(false, |added| added <= cutoff) {
                orphaned.push(record);
            }
        }
        iter.close()?;

        let recovered = orphaned.len();
        for record in orphaned {
            tracing::info!("Republishing orphaned in-flight operation [{}]", record.key);
            self.pubsub
                .publish(
                    OP_QUEUE_TOPIC,
                    Message::with_id(record.key.clone(), record.value),
                )
                .await
                .map_err(QueueError::Publish)?;
            self.inflight_store.delete(&record.key).await?;
        }

        if recovered > 0 {
            METRICS.republished_ops.inc_by(recovered as u64);
        }
        Ok(recovered)
    }
}
