use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WriterConfig {
    /// DID method namespace of anchored operations.
    pub namespace: String,

    /// Payload version, selecting the generator encoding anchors of this
    /// namespace.
    pub version: u64,

    /// Origin URL under which this node publishes anchors.
    pub origin: String,

    /// Maximum operations drained from the queue per batch.
    pub max_batch_operations: usize,

    /// Interval of the batching loop, in seconds.
    pub batch_interval_secs: u64,

    /// Time-to-live of unpublished operations, in seconds.
    pub unpublished_operation_ttl_secs: u64,
}

impl WriterConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.batch_interval_secs)
    }

    pub fn unpublished_operation_ttl(&self) -> Duration {
        Duration::from_secs(self.unpublished_operation_ttl_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            namespace: "did:anchor".to_string(),
            version: 1,
            origin: "https://anchor.domain1.com/services/anchor".to_string(),
            max_batch_operations: 100,
            batch_interval_secs: 1,
            unpublished_operation_ttl_secs: 600,
        }
    }
}
