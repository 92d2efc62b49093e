use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Metadata header carrying the redelivery count of a message.
pub const RETRY_COUNT_HEADER: &str = "retry-count";

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("failed to publish to topic [{0}]")]
    Publish(String),

    #[error("failed to subscribe to topic [{0}]")]
    Subscribe(String),
}

/// A broker message: opaque payload plus string metadata, identified by
/// a UUID assigned at first publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub payload: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl Message {
    pub fn new(payload: Vec<u8>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), payload)
    }

    pub fn with_id(id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            payload,
            metadata: HashMap::new(),
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.metadata
            .get(RETRY_COUNT_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_retry_count(&mut self, count: u32) {
        self.metadata
            .insert(RETRY_COUNT_HEADER.to_string(), count.to_string());
    }
}

/// Resolution handle of a delivered message. `ack` consumes the message;
/// `nack` returns it to the topic for redelivery, metadata untouched.
#[derive(Debug)]
pub struct Acker {
    topic: String,
    message: Message,
    nack_tx: mpsc::UnboundedSender<(String, Message)>,
}

impl Acker {
    pub fn ack(self) {}

    pub fn nack(self) {
        // The broker task is gone only on process shutdown, where the
        // message is lost together with the broker itself.
        let _ = self.nack_tx.send((self.topic, self.message));
    }
}

/// A message handed to a subscriber, together with its durable handle.
#[derive(Debug)]
pub struct Delivery {
    pub message: Message,
    pub acker: Acker,
}

/// A durable pub/sub broker. At-least-once: a message stays owned by the
/// broker until acked, and a nack makes it eligible for redelivery.
#[async_trait]
pub trait PubSub: Send + Sync + fmt::Debug {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), PubSubError>;

    /// Subscribes to a topic. `pool_size` bounds the number of in-flight
    /// deliveries.
    async fn subscribe(
        &self,
        topic: &str,
        pool_size: usize,
    ) -> Result<mpsc::Receiver<Delivery>, PubSubError>;
}

#[derive(Debug, Default)]
struct Topic {
    buffered: VecDeque<Message>,
    subscriber: Option<mpsc::Sender<Delivery>>,
}

/// In-process broker backing tests and single-node deployments.
/// Messages published before any subscriber exists are buffered and
/// delivered on subscribe; nacked messages re-enter the topic.
#[derive(Debug)]
pub struct MemPubSub {
    topics: Mutex<HashMap<String, Topic>>,
    nack_tx: mpsc::UnboundedSender<(String, Message)>,
}

impl MemPubSub {
    /// Must be called within a runtime: the redelivery loop is spawned
    /// here.
    pub fn new() -> Arc<Self> {
        let (nack_tx, mut nack_rx) = mpsc::unbounded_channel::<(String, Message)>();

        let pubsub = Arc::new(Self {
            topics: Mutex::new(HashMap::new()),
            nack_tx,
        });

        let weak = Arc::downgrade(&pubsub);
        tokio::spawn(async move {
            while let Some((topic, message)) = nack_rx.recv().await {
                let Some(pubsub) = weak.upgrade() else { break };
                if let Err(err) = pubsub.publish(&topic, message).await {
                    tracing::warn!("Failed to redeliver nacked message: {err}");
                }
            }
        });

        pubsub
    }

    fn delivery(&self, topic: &str, message: Message) -> Delivery {
        Delivery {
            acker: Acker {
                topic: topic.to_string(),
                message: message.clone(),
                nack_tx: self.nack_tx.clone(),
            },
            message,
        }
    }
}

#[async_trait]
impl PubSub for MemPubSub {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), PubSubError> {
        let sender = {
            let mut topics = self.topics.lock().await;
            let entry = topics.entry(topic.to_string()).or_default();
            match &entry.subscriber {
                Some(sender) if !sender.is_closed() => sender.clone(),
                _ => {
                    entry.buffered.push_back(message);
                    return Ok(());
                }
            }
        };

        let delivery = self.delivery(topic, message);
        if let Err(err) = sender.send(delivery).await {
            // The subscriber went away mid-send; keep the message.
            let mut topics = self.topics.lock().await;
            let entry = topics.entry(topic.to_string()).or_default();
            entry.buffered.push_back(err.0.message);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        pool_size: usize,
    ) -> Result<mpsc::Receiver<Delivery>, PubSubError> {
        let (tx, rx) = mpsc::channel(pool_size.max(1));

        let buffered = {
            let mut topics = self.topics.lock().await;
            let entry = topics.entry(topic.to_string()).or_default();
            entry.subscriber = Some(tx.clone());
            std::mem::take(&mut entry.buffered)
        };

        // Drain the backlog without holding the topic map across sends.
        let deliveries: Vec<Delivery> = buffered
            .into_iter()
            .map(|message| self.delivery(topic, message))
            .collect();
        tokio::spawn(async move {
            for delivery in deliveries {
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
