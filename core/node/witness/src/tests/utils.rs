use std::{sync::Arc, time::Duration};

use anchor_cas::{CasResolver, MemCasClient};
use anchor_config::{OpQueueConfig, VctConfig, WitnessConfig, WriterConfig};
use anchor_linkset::{AnchorBuilder, AnchorLinksetGenerator, Generator, Registry};
use anchor_opqueue::{MemPubSub, OperationQueue, PubSub};
use anchor_policy::WitnessPolicyStore;
use anchor_protocol::{ProtocolParameters, ProtocolVersionClient};
use anchor_storage::{MemStoreProvider, StoreProvider};
use anchor_store::{
    ActivityStore, LogEntryStore, Outbox, ReferenceStore, UnpublishedOperationStore,
};
use anchor_types::{QueuedOperation, VerifiableCredential};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::{
    collector::WitnessCollector,
    record::WitnessRecordStore,
    vct::{CredentialSigner, SignedTimestampVerifier, VctClient, VctResponse},
    writer::AnchorWriter,
};

#[derive(Debug)]
pub(crate) struct MockSigner;

impl CredentialSigner for MockSigner {
    fn sign(
        &self,
        _credential: &VerifiableCredential,
        created: DateTime<Utc>,
        domain: &str,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "type": "DataIntegrityProof",
            "created": created.to_rfc3339(),
            "domain": domain,
            "proofValue": "z5MockProofValue",
        }))
    }
}

#[derive(Debug)]
pub(crate) struct MockVerifier;

impl SignedTimestampVerifier for MockVerifier {
    fn verify(
        &self,
        _response: &VctResponse,
        _log_public_key: &[u8],
        _credential_bytes: &[u8],
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(crate) struct TestNode {
    pub provider: Arc<MemStoreProvider>,
    pub queue: Arc<OperationQueue>,
    pub collector: Arc<WitnessCollector>,
    pub writer: AnchorWriter,
    pub records: WitnessRecordStore,
    pub activities: ActivityStore,
    pub log_entries: LogEntryStore,
    pub references: ReferenceStore,
    pub unpublished: UnpublishedOperationStore,
    pub cas: CasResolver,
    pub policy: WitnessPolicyStore,
    pub witness_config: WitnessConfig,
    queue_stop: watch::Sender<bool>,
    queue_handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestNode {
    pub async fn start(witness_config: WitnessConfig) -> Self {
        let provider = Arc::new(MemStoreProvider::new());
        let pubsub = MemPubSub::new();

        let queue = OperationQueue::new(
            Arc::clone(&pubsub) as Arc<dyn PubSub>,
            provider.as_ref(),
            OpQueueConfig::for_tests(),
        )
        .await
        .unwrap();
        let (queue_stop, stop_receiver) = watch::channel(false);
        let queue_handle = tokio::spawn(Arc::clone(&queue).run(stop_receiver));
        while !queue.is_started() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let cas = CasResolver::new(Arc::new(MemCasClient::new()), None);

        let policy = WitnessPolicyStore::new(provider.open_store("anchor-config").await.unwrap());
        let records = WitnessRecordStore::new(provider.as_ref()).await.unwrap();
        let activities = ActivityStore::new(provider.as_ref()).await.unwrap();
        let outbox = Outbox::new(activities.clone());
        let log_entries = LogEntryStore::new(provider.as_ref()).await.unwrap();
        let references = ReferenceStore::new(provider.as_ref()).await.unwrap();
        let unpublished = UnpublishedOperationStore::new(provider.as_ref()).await.unwrap();

        let vct = VctClient::new(
            VctConfig::for_tests(),
            Arc::new(MockSigner),
            Arc::new(MockVerifier),
        )
        .unwrap();

        let writer_config = WriterConfig::for_tests();
        let collector = Arc::new(WitnessCollector::new(
            witness_config.clone(),
            writer_config.origin.clone(),
            policy.clone(),
            records.clone(),
            outbox.clone(),
            cas.clone(),
            vct,
            log_entries.clone(),
        ));

        let protocol = Arc::new(ProtocolVersionClient::new(vec![ProtocolParameters {
            genesis_time: 0,
            max_operations_per_batch: 100,
            max_operation_size: 2500,
        }]));
        let generators: Vec<Arc<dyn Generator>> = vec![Arc::new(AnchorLinksetGenerator::new())];
        let builder = AnchorBuilder::new(Arc::new(Registry::new(generators)));

        let writer = AnchorWriter::new(
            writer_config,
            Arc::clone(&queue),
            protocol,
            builder,
            cas.clone(),
            references.clone(),
            unpublished.clone(),
            Arc::clone(&collector),
        );

        Self {
            provider,
            queue,
            collector,
            writer,
            records,
            activities,
            log_entries,
            references,
            unpublished,
            cas,
            policy,
            witness_config,
            queue_stop,
            queue_handle,
        }
    }

    pub async fn add_operations(&self, operations: &[QueuedOperation]) {
        for operation in operations {
            self.queue.add(operation.clone(), 0).await.unwrap();
        }
        self.wait_for_pending(operations.len()).await;
    }

    pub async fn wait_for_pending(&self, expected: usize) {
        for _ in 0..500 {
            if self.queue.len().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {expected} pending operations");
    }

    pub async fn stop(self) {
        self.queue_stop.send(true).unwrap();
        self.queue_handle.await.unwrap().unwrap();
    }
}

pub(crate) fn operation(suffix: &str, request: &str, origin: Option<&str>) -> QueuedOperation {
    QueuedOperation {
        suffix: suffix.to_string(),
        operation_request: request.as_bytes().to_vec(),
        anchor_origin: origin.map(str::to_string),
    }
}

pub(crate) fn sample_payload() -> anchor_types::AnchorPayload {
    anchor_types::AnchorPayload {
        namespace: "did:anchor".to_string(),
        version: 1,
        core_index: anchor_types::hashlink::Hashlink::new(b"core index file").to_string(),
        publisher_origin: url::Url::parse("https://anchor.domain1.com/services/anchor").unwrap(),
        published: Some(Utc::now()),
        operation_count: 1,
        previous_anchors: vec![anchor_types::SuffixAnchor {
            suffix: "EiAone".to_string(),
            previous_anchor: None,
        }],
    }
}

pub(crate) fn build_anchor() -> (anchor_linkset::BuiltAnchor, anchor_types::AnchorPayload) {
    let generators: Vec<Arc<dyn Generator>> = vec![Arc::new(AnchorLinksetGenerator::new())];
    let builder = AnchorBuilder::new(Arc::new(Registry::new(generators)));
    let payload = sample_payload();
    let built = builder.build(&payload, None).unwrap();
    (built, payload)
}
