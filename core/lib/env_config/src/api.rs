use anchor_config::ApiConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for ApiConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("api", "ANCHOR_API_")
    }
}
