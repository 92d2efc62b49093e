use std::sync::Arc;

use anchor_storage::{Store, StoreError, StoreProvider, Tag, TagExpr, TIME_ADDED_TAG};
use anchor_types::{time::seconds_since_epoch, Activity};

use crate::{store_names, AnchorStoreError};

const ACTIVITY_TAG: &str = "activity";

/// Activities keyed by their URL, tagged for retrieval by type and by
/// creation time.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    store: Arc<dyn Store>,
}

impl ActivityStore {
    pub async fn new(provider: &dyn StoreProvider) -> Result<Self, AnchorStoreError> {
        let store = provider.open_store(store_names::ACTIVITY).await?;
        Ok(Self { store })
    }

    pub async fn put(&self, activity: &Activity) -> Result<(), AnchorStoreError> {
        let bytes = serde_json::to_vec(activity)
            .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?;

        self.store
            .put(
                &activity.id,
                &bytes,
                &[
                    Tag::new(ACTIVITY_TAG, activity.activity_type.clone()),
                    Tag::new(TIME_ADDED_TAG, seconds_since_epoch().to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Activity, AnchorStoreError> {
        let bytes = self.store.get(id).await?;
        serde_json::from_slice(&bytes).map_err(|e| AnchorStoreError::Corrupted(e.to_string()))
    }

    /// Activities of the given type, in insertion order.
    pub async fn query_by_type(
        &self,
        activity_type: &str,
    ) -> Result<Vec<Activity>, AnchorStoreError> {
        let mut iter = self
            .store
            .query(&[TagExpr::equals(ACTIVITY_TAG, activity_type)])
            .await?;

        let mut activities = Vec::with_capacity(iter.total_items());
        while let Some(record) = iter.next().await? {
            activities.push(
                serde_json::from_slice(&record.value)
                    .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?,
            );
        }
        iter.close()?;
        Ok(activities)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await
    }
}
