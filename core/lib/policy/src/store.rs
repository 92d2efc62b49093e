use std::sync::Arc;

use anchor_storage::{Store, StoreError};
use thiserror::Error;

use crate::parser::{PolicyError, WitnessPolicy};

/// Key under which the raw policy string is persisted in the config
/// store.
pub const POLICY_KEY: &str = "witness-policy";

#[derive(Debug, Error)]
pub enum PolicyStoreError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored policy is not valid UTF-8")]
    Corrupted,
}

/// Persists the deployment witness policy. The raw string is revalidated
/// on every write; readers receive the parsed form.
#[derive(Debug, Clone)]
pub struct WitnessPolicyStore {
    store: Arc<dyn Store>,
}

impl WitnessPolicyStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn set(&self, policy: &str) -> Result<(), PolicyStoreError> {
        let trimmed = policy.trim();
        trimmed.parse::<WitnessPolicy>()?;
        self.store.put(POLICY_KEY, trimmed.as_bytes(), &[]).await?;
        tracing::info!("Witness policy updated to [{trimmed}]");
        Ok(())
    }

    /// The stored policy string, or `None` when unset.
    pub async fn get(&self) -> Result<Option<String>, PolicyStoreError> {
        match self.store.get(POLICY_KEY).await {
            Ok(bytes) => {
                let value = String::from_utf8(bytes).map_err(|_| PolicyStoreError::Corrupted)?;
                Ok(Some(value))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The parsed policy; the empty policy when unset.
    pub async fn load(&self) -> Result<WitnessPolicy, PolicyStoreError> {
        match self.get().await? {
            Some(value) => Ok(value.parse()?),
            None => Ok(WitnessPolicy::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use anchor_storage::{MemStoreProvider, StoreProvider};
    use assert_matches::assert_matches;

    use super::*;

    async fn policy_store() -> WitnessPolicyStore {
        let provider = MemStoreProvider::new();
        WitnessPolicyStore::new(provider.open_store("anchor-config").await.unwrap())
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = policy_store().await;
        store.set("OutOf(1,system) AND MinPercent(50,batch)").await.unwrap();
        assert_eq!(
            store.get().await.unwrap().unwrap(),
            "OutOf(1,system) AND MinPercent(50,batch)"
        );
    }

    #[tokio::test]
    async fn invalid_policy_is_not_stored() {
        let store = policy_store().await;
        assert_matches!(
            store.set("Test(2,3)").await,
            Err(PolicyStoreError::Policy(_))
        );
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_of_unset_policy_is_empty() {
        let store = policy_store().await;
        assert!(store.load().await.unwrap().is_empty());
    }
}
