use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Bind address of the policy endpoint, e.g. `0.0.0.0:8070`.
    pub bind_addr: String,

    /// Request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:8070".to_string(),
            request_timeout_secs: 30,
        }
    }
}
