use serde::{Deserialize, Serialize};

/// A DID operation accepted for anchoring. The operation request bytes are
/// opaque to the queue and the batcher; only the Sidetree operation parser
/// interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub suffix: String,
    pub operation_request: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<String>,
}

/// The wire form published to the operation queue topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMessage {
    pub operation: QueuedOperation,
    pub protocol_genesis_time: u64,
}
