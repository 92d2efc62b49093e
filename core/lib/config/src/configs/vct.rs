use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VctConfig {
    /// Endpoint of the verifiable-credential transparency log. Unset
    /// disables submission; a local proof is attached instead.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the log endpoint.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl VctConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    // Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            request_timeout_secs: 10,
        }
    }
}
