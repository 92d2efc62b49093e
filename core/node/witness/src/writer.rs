use std::sync::Arc;

use anchor_cas::CasResolver;
use anchor_config::WriterConfig;
use anchor_linkset::AnchorBuilder;
use anchor_opqueue::{OperationQueue, OperationRef};
use anchor_protocol::ProtocolVersionClient;
use anchor_store::{ref_types, ReferenceStore, UnpublishedOperationStore};
use anchor_types::{activity::CREATE_TYPE, AnchorPayload, QueuedOperation, SuffixAnchor};
use anyhow::Context as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::{collector::WitnessCollector, metrics::METRICS};

/// The operation-index file written to CAS per batch; the anchor's core
/// index locator points at it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CoreIndexFile {
    pub operations: Vec<QueuedOperation>,
}

/// Drains the operation queue, builds anchors through the generator
/// registry and opens witness collection for each.
#[derive(Debug)]
pub struct AnchorWriter {
    config: WriterConfig,
    queue: Arc<OperationQueue>,
    protocol: Arc<ProtocolVersionClient>,
    builder: AnchorBuilder,
    cas: CasResolver,
    references: ReferenceStore,
    unpublished: UnpublishedOperationStore,
    collector: Arc<WitnessCollector>,
}

impl AnchorWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WriterConfig,
        queue: Arc<OperationQueue>,
        protocol: Arc<ProtocolVersionClient>,
        builder: AnchorBuilder,
        cas: CasResolver,
        references: ReferenceStore,
        unpublished: UnpublishedOperationStore,
        collector: Arc<WitnessCollector>,
    ) -> Self {
        Self {
            config,
            queue,
            protocol,
            builder,
            cas,
            references,
            unpublished,
            collector,
        }
    }

    pub async fn run(self, mut stop_receiver: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut timer = tokio::time::interval(self.config.batch_interval());

        while !*stop_receiver.borrow_and_update() {
            tokio::select! {
                _ = timer.tick() => { /* continue iterations */ }
                _ = stop_receiver.changed() => break,
            }

            match self.loop_iteration().await {
                Ok(()) => {}
                Err(err) => {
                    tracing::error!("Failed to anchor a batch: {err:?}");
                }
            }
        }

        tracing::info!("Stop signal received, anchor writer is shutting down");
        Ok(())
    }

    pub async fn loop_iteration(&self) -> anyhow::Result<()> {
        let (ops, batch) = self
            .queue
            .remove(self.config.max_batch_operations)
            .await
            .context("failed to remove operations from the queue")?;

        if ops.is_empty() {
            batch.ack().await;
            return Ok(());
        }

        match self.write_batches(&ops).await {
            Ok(()) => {
                batch.ack().await;
                Ok(())
            }
            Err(err) => {
                // Redelivery; the queue's retry ceiling bounds how often
                // a poisonous batch comes back.
                batch.nack().await;
                Err(err)
            }
        }
    }

    async fn write_batches(&self, ops: &[OperationRef]) -> anyhow::Result<()> {
        // Operations of different protocol versions anchor separately.
        let mut groups: Vec<(u64, Vec<&OperationRef>)> = Vec::new();
        for op in ops {
            match groups
                .iter_mut()
                .find(|(t, _)| *t == op.protocol_genesis_time)
            {
                Some((_, group)) => group.push(op),
                None => groups.push((op.protocol_genesis_time, vec![op])),
            }
        }

        for (genesis_time, group) in groups {
            self.write_batch(genesis_time, &group)
                .await
                .with_context(|| {
                    format!("failed to anchor batch of {} operations", group.len())
                })?;
            METRICS.anchored_batches.inc();
        }
        Ok(())
    }

    async fn write_batch(
        &self,
        genesis_time: u64,
        group: &[&OperationRef],
    ) -> anyhow::Result<()> {
        let params = self.protocol.get(genesis_time)?;
        anyhow::ensure!(
            group.len() as u64 <= params.max_operations_per_batch,
            "batch of {} operations exceeds the protocol maximum of {}",
            group.len(),
            params.max_operations_per_batch
        );
        for op in group {
            anyhow::ensure!(
                op.operation.operation_request.len() as u64 <= params.max_operation_size,
                "operation for suffix [{}] exceeds the maximum size of {} bytes",
                op.operation.suffix,
                params.max_operation_size
            );
        }

        let core_file = CoreIndexFile {
            operations: group.iter().map(|op| op.operation.clone()).collect(),
        };
        let core_bytes = serde_json::to_vec(&core_file)?;
        let write = self.cas.write(&core_bytes).await?;
        let core_index = write.hashlink(&core_bytes).to_string();

        let mut previous_anchors: Vec<SuffixAnchor> = Vec::new();
        for op in group {
            if previous_anchors
                .iter()
                .any(|sa| sa.suffix == op.operation.suffix)
            {
                continue;
            }
            let previous_anchor = self.latest_anchor(&op.operation.suffix).await?;
            previous_anchors.push(SuffixAnchor {
                suffix: op.operation.suffix.clone(),
                previous_anchor,
            });
        }

        let payload = AnchorPayload {
            namespace: self.config.namespace.clone(),
            version: self.config.version,
            core_index,
            publisher_origin: Url::parse(&self.config.origin)
                .context("writer origin is not a valid URL")?,
            published: Some(Utc::now()),
            operation_count: group.len() as u64,
            previous_anchors,
        };

        let built = self.builder.build(&payload, None)?;
        self.cas.write(&built.linkset_bytes).await?;

        let anchor_hashlink = built.hashlink.to_string();
        for op in group {
            self.references
                .add(
                    ref_types::ANCHOR,
                    &op.operation.suffix,
                    &anchor_hashlink,
                    Some(CREATE_TYPE),
                )
                .await?;
            self.unpublished
                .put(
                    &op.operation,
                    genesis_time,
                    self.config.unpublished_operation_ttl(),
                )
                .await?;
        }

        let mut batch_witnesses: Vec<String> = Vec::new();
        for op in group {
            if let Some(origin) = &op.operation.anchor_origin {
                if !batch_witnesses.contains(origin) {
                    batch_witnesses.push(origin.clone());
                }
            }
        }

        self.collector
            .propose(&built, &payload, batch_witnesses)
            .await?;

        tracing::info!(
            "Anchored {} operations under [{anchor_hashlink}]",
            group.len()
        );
        Ok(())
    }

    /// The hashlink of the anchor that last touched the suffix, absent
    /// for a suffix never anchored before.
    async fn latest_anchor(&self, suffix: &str) -> anyhow::Result<Option<String>> {
        let mut iter = self.references.query(ref_types::ANCHOR, suffix).await?;
        let mut latest = None;
        while let Some(reference) = iter.next().await? {
            latest = Some(reference);
        }
        iter.close()?;
        Ok(latest)
    }
}
