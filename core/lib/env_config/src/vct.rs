use anchor_config::VctConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for VctConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("vct", "ANCHOR_VCT_")
    }
}
