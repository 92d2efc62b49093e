use anyhow::Context as _;
use serde::de::DeserializeOwned;

mod api;
mod cas;
mod expiry;
mod opqueue;
mod task_coordinator;
mod vct;
mod witness;
mod writer;

pub trait FromEnv: Sized {
    fn from_env() -> anyhow::Result<Self>;
}

/// Convenience function that loads the structure from the environment variable given the prefix.
pub fn envy_load<T: DeserializeOwned>(name: &str, prefix: &str) -> anyhow::Result<T> {
    envy::prefixed(prefix)
        .from_env()
        .with_context(|| format!("Cannot load config <{name}>"))
}
