use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OpQueueConfig {
    /// Concurrency of in-flight deliveries from the broker.
    pub pool_size: usize,

    /// Number of redeliveries after which an operation is dropped and
    /// moved to the retention store.
    pub max_retries: u32,

    /// Interval of the in-flight monitor task, in seconds.
    pub monitor_interval_secs: u64,

    /// An in-flight entry older than this without ack/nack is considered
    /// orphaned by a dead node and is republished, in seconds.
    pub inflight_expiry_secs: u64,
}

impl OpQueueConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn inflight_expiry(&self) -> Duration {
        Duration::from_secs(self.inflight_expiry_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            pool_size: 5,
            max_retries: 3,
            monitor_interval_secs: 10,
            inflight_expiry_secs: 60,
        }
    }
}
