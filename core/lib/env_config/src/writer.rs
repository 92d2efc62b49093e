use anchor_config::WriterConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for WriterConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("writer", "ANCHOR_WRITER_")
    }
}
