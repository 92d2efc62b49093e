use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExpiryConfig {
    /// Interval between expiry sweeps, in seconds.
    pub sweep_interval_secs: u64,

    /// Maximum rows deleted per store per sweep.
    pub sweep_batch_size: usize,
}

impl ExpiryConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            sweep_interval_secs: 60,
            sweep_batch_size: 500,
        }
    }
}
