use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TaskCoordinatorConfig {
    /// Interval at which registered tasks are checked against their
    /// permits, in seconds.
    pub poll_interval_secs: u64,
}

impl TaskCoordinatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

impl Default for TaskCoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}
