use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WitnessConfig {
    /// System witnesses solicited for every anchor, in addition to the
    /// batch witnesses accompanying each proposal.
    #[serde(default)]
    pub system_witnesses: Vec<String>,

    /// Number of resolicitation rounds before an unsatisfied anchor is
    /// rejected.
    pub max_resolicits: u32,

    /// Base of the capped exponential resolicitation backoff, in seconds.
    pub resolicit_backoff_secs: u64,

    /// Interval of the collection loop, in seconds.
    pub poll_interval_secs: u64,

    /// A published anchor older than this is archived, in seconds.
    pub retention_secs: u64,

    /// URL under which witnessed entries are recorded in the log-entry
    /// store.
    pub log_url: String,
}

impl WitnessConfig {
    pub fn resolicit_backoff(&self) -> Duration {
        Duration::from_secs(self.resolicit_backoff_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            system_witnesses: Vec::new(),
            max_resolicits: 3,
            resolicit_backoff_secs: 10,
            poll_interval_secs: 1,
            retention_secs: 3600,
            log_url: "https://vct.example.com/maple2024".to_string(),
        }
    }
}
