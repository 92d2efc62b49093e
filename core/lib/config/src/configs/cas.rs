use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CasConfig {
    /// Base URL of the HTTP CAS backend. Unset selects the in-process
    /// backend.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Deployment-local retrieval hint attached to written content
    /// (e.g. a webcas prefix).
    #[serde(default)]
    pub hint: Option<String>,

    /// Request timeout for the HTTP backend, in seconds.
    pub request_timeout_secs: u64,
}

impl CasConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            endpoint: None,
            hint: Some("https://anchor.domain1.com/cas".to_string()),
            request_timeout_secs: 10,
        }
    }
}
