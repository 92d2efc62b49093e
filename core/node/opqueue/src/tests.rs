use std::{sync::Arc, time::Duration};

use anchor_config::OpQueueConfig;
use anchor_storage::{MemStoreProvider, StoreProvider, Tag, TagExpr, TIME_ADDED_TAG};
use anchor_types::QueuedOperation;
use assert_matches::assert_matches;
use tokio::sync::watch;

use super::*;
use crate::queue::OperationQueue;

struct QueueTest {
    pubsub: Arc<MemPubSub>,
    provider: Arc<MemStoreProvider>,
    queue: Arc<OperationQueue>,
    stop_sender: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl QueueTest {
    async fn start(config: OpQueueConfig) -> Self {
        let pubsub = MemPubSub::new();
        let provider = Arc::new(MemStoreProvider::new());

        let queue = OperationQueue::new(
            Arc::clone(&pubsub) as Arc<dyn PubSub>,
            provider.as_ref(),
            config,
        )
        .await
        .unwrap();

        let (stop_sender, stop_receiver) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&queue).run(stop_receiver));

        wait_until(|| {
            let queue = Arc::clone(&queue);
            async move { queue.is_started() }
        })
        .await;

        Self {
            pubsub,
            provider,
            queue,
            stop_sender,
            handle,
        }
    }

    async fn stop(self) {
        self.stop_sender.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }

    async fn wait_for_pending(&self, expected: usize) {
        let queue = Arc::clone(&self.queue);
        wait_until(move || {
            let queue = Arc::clone(&queue);
            async move { queue.len().await == expected }
        })
        .await;
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for queue condition");
}

fn operation(suffix: &str) -> QueuedOperation {
    QueuedOperation {
        suffix: suffix.to_string(),
        operation_request: format!("{{\"op\":\"{suffix}\"}}").into_bytes(),
        anchor_origin: Some("https://anchor.domain2.com/services/anchor".to_string()),
    }
}

#[tokio::test]
async fn add_before_start_fails() {
    let pubsub = MemPubSub::new();
    let provider = MemStoreProvider::new();
    let queue = OperationQueue::new(
        pubsub as Arc<dyn PubSub>,
        &provider,
        OpQueueConfig::for_tests(),
    )
    .await
    .unwrap();

    assert_matches!(
        queue.add(operation("EiA1"), 0).await,
        Err(QueueError::NotStarted)
    );
}

#[tokio::test]
async fn delivers_added_operations_in_order() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    for suffix in ["EiA1", "EiA2", "EiA3"] {
        test.queue.add(operation(suffix), 0).await.unwrap();
    }
    test.wait_for_pending(3).await;

    // Peek is non-destructive.
    let peeked = test.queue.peek(2).await;
    assert_eq!(peeked.len(), 2);
    assert_eq!(test.queue.len().await, 3);

    let (refs, batch) = test.queue.remove(10).await.unwrap();
    let suffixes: Vec<&str> = refs.iter().map(|r| r.operation.suffix.as_str()).collect();
    assert_eq!(suffixes, ["EiA1", "EiA2", "EiA3"]);
    batch.ack().await;

    assert_eq!(test.queue.len().await, 0);
    test.stop().await;
}

#[tokio::test]
async fn ack_clears_inflight_snapshots() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    test.queue.add(operation("EiA1"), 0).await.unwrap();
    test.wait_for_pending(1).await;

    let inflight = test.provider.open_store(INFLIGHT_STORE).await.unwrap();
    let iter = inflight
        .query(&[TagExpr::with_name(TIME_ADDED_TAG)])
        .await
        .unwrap();
    assert_eq!(iter.total_items(), 1);

    let (_, batch) = test.queue.remove(1).await.unwrap();
    batch.ack().await;

    let iter = inflight
        .query(&[TagExpr::with_name(TIME_ADDED_TAG)])
        .await
        .unwrap();
    assert_eq!(iter.total_items(), 0);
    test.stop().await;
}

#[tokio::test]
async fn nack_redelivers_for_another_remove() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    test.queue.add(operation("EiA1"), 7).await.unwrap();
    test.wait_for_pending(1).await;

    let (refs, batch) = test.queue.remove(1).await.unwrap();
    assert_eq!(refs[0].protocol_genesis_time, 7);
    batch.nack().await;

    test.wait_for_pending(1).await;
    let (refs, batch) = test.queue.remove(1).await.unwrap();
    assert_eq!(refs[0].operation.suffix, "EiA1");
    batch.ack().await;
    test.stop().await;
}

#[tokio::test]
async fn drops_operations_exceeding_max_retries() {
    let mut config = OpQueueConfig::for_tests();
    config.max_retries = 1;
    let test = QueueTest::start(config).await;

    for i in 0..5 {
        test.queue.add(operation(&format!("EiA{i}")), 0).await.unwrap();
    }
    test.wait_for_pending(5).await;

    // First nack: retry counter goes to 1, everything is redelivered.
    let (refs, batch) = test.queue.remove(5).await.unwrap();
    assert_eq!(refs.len(), 5);
    batch.nack().await;
    test.wait_for_pending(5).await;

    // Second nack: the counter exceeds the ceiling, everything is
    // dropped into retention.
    let (refs, batch) = test.queue.remove(5).await.unwrap();
    assert_eq!(refs.len(), 5);
    batch.nack().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let (refs, batch) = test.queue.remove(5).await.unwrap();
    assert!(refs.is_empty());
    batch.ack().await;

    let retention = test.provider.open_store(RETENTION_STORE).await.unwrap();
    let iter = retention
        .query(&[TagExpr::equals("reason", "max-retries-exceeded")])
        .await
        .unwrap();
    assert_eq!(iter.total_items(), 5);
    test.stop().await;
}

#[tokio::test]
async fn malformed_messages_are_dropped() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    test.pubsub
        .publish(OP_QUEUE_TOPIC, Message::new(b"not json".to_vec()))
        .await
        .unwrap();
    test.queue.add(operation("EiA1"), 0).await.unwrap();

    test.wait_for_pending(1).await;
    let peeked = test.queue.peek(10).await;
    assert_eq!(peeked.len(), 1);
    assert_eq!(peeked[0].operation.suffix, "EiA1");
    test.stop().await;
}

#[tokio::test]
async fn stop_returns_inflight_operations_to_the_broker() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    test.queue.add(operation("EiA1"), 0).await.unwrap();
    test.wait_for_pending(1).await;

    let pubsub = Arc::clone(&test.pubsub);
    let provider = Arc::clone(&test.provider);
    test.stop().await;

    // A successor queue on the same broker picks the operation up.
    let queue = OperationQueue::new(
        pubsub as Arc<dyn PubSub>,
        provider.as_ref(),
        OpQueueConfig::for_tests(),
    )
    .await
    .unwrap();
    let (stop_sender, stop_receiver) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&queue).run(stop_receiver));

    let successor = Arc::clone(&queue);
    wait_until(move || {
        let queue = Arc::clone(&successor);
        async move { queue.len().await == 1 }
    })
    .await;

    stop_sender.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn monitor_republishes_orphaned_operations() {
    let test = QueueTest::start(OpQueueConfig::for_tests()).await;

    let monitor = QueueMonitor::new(
        Arc::clone(&test.pubsub) as Arc<dyn PubSub>,
        test.provider.as_ref(),
        OpQueueConfig::for_tests(),
    )
    .await
    .unwrap();

    // An in-flight snapshot left behind by a node that died mid-batch.
    let wire = anchor_types::OperationMessage {
        operation: operation("EiAorphan"),
        protocol_genesis_time: 0,
    };
    let inflight = test.provider.open_store(INFLIGHT_STORE).await.unwrap();
    inflight
        .put(
            "orphan-id",
            &serde_json::to_vec(&wire).unwrap(),
            &[Tag::new(TIME_ADDED_TAG, "1")],
        )
        .await
        .unwrap();

    let recovered = monitor.check_once().await.unwrap();
    assert_eq!(recovered, 1);

    test.wait_for_pending(1).await;
    let peeked = test.queue.peek(1).await;
    assert_eq!(peeked[0].operation.suffix, "EiAorphan");
    test.stop().await;
}

#[tokio::test]
async fn fresh_inflight_entries_are_not_republished() {
    let pubsub = MemPubSub::new();
    let provider = MemStoreProvider::new();

    let monitor = QueueMonitor::new(
        Arc::clone(&pubsub) as Arc<dyn PubSub>,
        &provider,
        OpQueueConfig::for_tests(),
    )
    .await
    .unwrap();

    let inflight = provider.open_store(INFLIGHT_STORE).await.unwrap();
    inflight
        .put(
            "fresh-id",
            b"payload",
            &[Tag::new(
                TIME_ADDED_TAG,
                anchor_types::time::seconds_since_epoch().to_string(),
            )],
        )
        .await
        .unwrap();

    assert_eq!(monitor.check_once().await.unwrap(), 0);
}
