use std::sync::Arc;

use anchor_config::ExpiryConfig;
use anchor_types::time::seconds_since_epoch;
use tokio::sync::{watch, Mutex};

use crate::{Store, StoreError, TagExpr, EXPIRY_TAG};

/// Sweeps records whose expiry tag lies in the past. One sweeper runs per
/// process; deployments register it as a coordinated task so a single
/// node of the cluster performs the sweep.
#[derive(Debug)]
pub struct ExpirySweeper {
    config: ExpiryConfig,
    stores: Mutex<Vec<Arc<dyn Store>>>,
}

impl ExpirySweeper {
    pub fn new(config: ExpiryConfig) -> Self {
        Self {
            config,
            stores: Mutex::new(Vec::new()),
        }
    }

    /// Registers a store for sweeping. Records without the expiry tag are
    /// never touched.
    pub async fn register(&self, store: Arc<dyn Store>) {
        let mut stores = self.stores.lock().await;
        if stores.iter().any(|s| s.name() == store.name()) {
            return;
        }
        stores.push(store);
    }

    /// Deletes expired records from every registered store, up to the
    /// configured batch size per store.
    pub async fn sweep_once(&self) -> Result<(), StoreError> {
        let stores = self.stores.lock().await.clone();
        let now = seconds_since_epoch();

        for store in stores {
            let deleted = self.sweep_store(&store, now).await?;
            if deleted > 0 {
                tracing::info!(
                    "Swept {deleted} expired records from store [{}]",
                    store.name()
                );
            }
        }
        Ok(())
    }

    async fn sweep_store(&self, store: &Arc<dyn Store>, now: u64) -> Result<usize, StoreError> {
        let mut iter = store.query(&[TagExpr::with_name(EXPIRY_TAG)]).await?;

        let mut expired = Vec::new();
        while let Some(record) = iter.next().await? {
            if expired.len() >= self.config.sweep_batch_size {
                break;
            }
            let is_expired = record
                .tags
                .iter()
                .find(|tag| tag.name == EXPIRY_TAG)
                .and_then(|tag| tag.value.parse::<u64>().ok())
                .map_or(false, |expiry| expiry <= now);
            if is_expired {
                expired.push(record.key);
            }
        }
        iter.close()?;

        let deleted = expired.len();
        for key in expired {
            store.delete(&key).await?;
        }
        Ok(deleted)
    }

    pub async fn run(
        self: Arc<Self>,
        mut stop_receiver: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut timer = tokio::time::interval(self.config.sweep_interval());

        while !*stop_receiver.borrow_and_update() {
            tokio::select! {
                _ = timer.tick() => { /* continue iterations */ }
                _ = stop_receiver.changed() => break,
            }

            if let Err(err) = self.sweep_once().await {
                tracing::error!("Failed to sweep expired records: {err}");
            }
        }

        tracing::info!("Stop signal received, expiry sweeper is shutting down");
        Ok(())
    }
}
