use anchor_config::WitnessConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for WitnessConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("witness", "ANCHOR_WITNESS_")
    }
}
