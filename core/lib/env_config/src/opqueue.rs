use anchor_config::OpQueueConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for OpQueueConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("opqueue", "ANCHOR_OPQUEUE_")
    }
}
