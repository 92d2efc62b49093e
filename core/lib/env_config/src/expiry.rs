use anchor_config::ExpiryConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for ExpiryConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("expiry", "ANCHOR_EXPIRY_")
    }
}
