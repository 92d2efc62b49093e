use anchor_config::TaskCoordinatorConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for TaskCoordinatorConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("task_coordinator", "ANCHOR_TASK_COORDINATOR_")
    }
}
