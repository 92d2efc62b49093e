use std::sync::Arc;

use anchor_storage::{Store, StoreProvider, Tag, TagExpr};
use anchor_types::{AnchorEvent, AnchorStatus, WitnessProof};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::WitnessError;

/// Name of the store holding witness collection records.
pub const WITNESS_STORE: &str = "anchor-witness";

const STATUS_TAG: &str = "status";

/// Per-anchor witness collection state: the proof record plus everything
/// needed to publish once the policy is satisfied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorWitnessRecord {
    pub anchor_hashlink: String,
    pub status: AnchorStatus,
    pub witnesses: Vec<WitnessProof>,
    pub event: AnchorEvent,
    pub linkset_bytes: Vec<u8>,
    pub core_index: String,
    pub operation_count: u64,
    pub created_at: DateTime<Utc>,
    pub resolicits: u32,
    pub next_solicit_unix: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_unix: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WitnessRecordStore {
    store: Arc<dyn Store>,
}

impl WitnessRecordStore {
    pub async fn new(provider: &dyn StoreProvider) -> Result<Self, WitnessError> {
        let store = provider.open_store(WITNESS_STORE).await?;
        Ok(Self { store })
    }

    pub async fn put(&self, record: &AnchorWitnessRecord) -> Result<(), WitnessError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| WitnessError::Corrupted(e.to_string()))?;
        self.store
            .put(
                &record.anchor_hashlink,
                &bytes,
                &[Tag::new(STATUS_TAG, record.status.to_string())],
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, anchor_hashlink: &str) -> Result<AnchorWitnessRecord, WitnessError> {
        let bytes = self.store.get(anchor_hashlink).await.map_err(|err| {
            if err.is_not_found() {
                WitnessError::AnchorNotFound(anchor_hashlink.to_string())
            } else {
                err.into()
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| WitnessError::Corrupted(e.to_string()))
    }

    pub async fn delete(&self, anchor_hashlink: &str) -> Result<(), WitnessError> {
        self.store.delete(anchor_hashlink).await?;
        Ok(())
    }

    /// Records in the given state, oldest first.
    pub async fn query_by_status(
        &self,
        status: AnchorStatus,
    ) -> Result<Vec<AnchorWitnessRecord>, WitnessError> {
        let mut iter = self
            .store
            .query(&[TagExpr::equals(STATUS_TAG, status.to_string())])
            .await?;

        let mut records = Vec::with_capacity(iter.total_items());
        while let Some(record) = iter.next().await? {
            records.push(
                serde_json::from_slice(&record.value)
                    .map_err(|e| WitnessError::Corrupted(e.to_string()))?,
            );
        }
        iter.close()?;
        Ok(records)
    }
}
