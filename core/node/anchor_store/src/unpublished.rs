use std::{sync::Arc, time::Duration};

use anchor_storage::{Store, StoreProvider, Tag, TagExpr, EXPIRY_TAG};
use anchor_types::{time::seconds_since_epoch, OperationMessage, QueuedOperation};
use sha2::{Digest, Sha256};

use crate::{store_names, AnchorStoreError};

const SUFFIX_TAG: &str = "suffix";

/// Operations anchored but not yet observed as published, kept per
/// suffix so resolvers can apply them ahead of observation. Rows expire
/// through the shared expiry sweeper.
#[derive(Debug, Clone)]
pub struct UnpublishedOperationStore {
    store: Arc<dyn Store>,
}

impl UnpublishedOperationStore {
    pub async fn new(provider: &dyn StoreProvider) -> Result<Self, AnchorStoreError> {
        let store = provider.open_store(store_names::UNPUBLISHED_OPERATION).await?;
        Ok(Self { store })
    }

    /// The backing store, for registration with the expiry sweeper.
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub async fn put(
        &self,
        operation: &QueuedOperation,
        protocol_genesis_time: u64,
        ttl: Duration,
    ) -> Result<(), AnchorStoreError> {
        let wire = OperationMessage {
            operation: operation.clone(),
            protocol_genesis_time,
        };
        let bytes = serde_json::to_vec(&wire)
            .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?;

        let key = format!("{}|{}", operation.suffix, fingerprint(operation));
        let expiry = seconds_since_epoch() + ttl.as_secs();

        self.store
            .put(
                &key,
                &bytes,
                &[
                    Tag::new(SUFFIX_TAG, operation.suffix.clone()),
                    Tag::new(EXPIRY_TAG, expiry.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Unpublished operations of a suffix, in the order they were added.
    pub async fn get_by_suffix(
        &self,
        suffix: &str,
    ) -> Result<Vec<OperationMessage>, AnchorStoreError> {
        let mut iter = self
            .store
            .query(&[TagExpr::equals(SUFFIX_TAG, suffix)])
            .await?;

        let mut operations = Vec::with_capacity(iter.total_items());
        while let Some(record) = iter.next().await? {
            operations.push(
                serde_json::from_slice(&record.value)
                    .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?,
            );
        }
        iter.close()?;
        Ok(operations)
    }

    /// Removes every unpublished operation of a suffix, typically once
    /// the suffix has been observed as published.
    pub async fn delete_by_suffix(&self, suffix: &str) -> Result<usize, AnchorStoreError> {
        let mut iter = self
            .store
            .query(&[TagExpr::equals(SUFFIX_TAG, suffix)])
            .await?;

        let mut keys = Vec::with_capacity(iter.total_items());
        while let Some(record) = iter.next().await? {
            keys.push(record.key);
        }
        iter.close()?;

        let deleted = keys.len();
        for key in keys {
            self.store.delete(&key).await?;
        }
        Ok(deleted)
    }
}

/// A stable fingerprint of the operation request, making re-anchoring of
/// the identical request idempotent.
fn fingerprint(operation: &QueuedOperation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&operation.operation_request);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use anchor_storage::MemStoreProvider;

    use super::*;

    fn operation(suffix: &str, request: &str) -> QueuedOperation {
        QueuedOperation {
            suffix: suffix.to_string(),
            operation_request: request.as_bytes().to_vec(),
            anchor_origin: None,
        }
    }

    #[tokio::test]
    async fn stores_and_lists_per_suffix_in_order() {
        let provider = MemStoreProvider::new();
        let store = UnpublishedOperationStore::new(&provider).await.unwrap();
        let ttl = Duration::from_secs(600);

        store.put(&operation("EiAone", "create"), 0, ttl).await.unwrap();
        store.put(&operation("EiAone", "update-1"), 0, ttl).await.unwrap();
        store.put(&operation("EiAtwo", "create"), 0, ttl).await.unwrap();

        let ops = store.get_by_suffix("EiAone").await.unwrap();
        let requests: Vec<&[u8]> = ops
            .iter()
            .map(|m| m.operation.operation_request.as_slice())
            .collect();
        assert_eq!(requests, [b"create".as_slice(), b"update-1".as_slice()]);
    }

    #[tokio::test]
    async fn identical_request_is_idempotent() {
        let provider = MemStoreProvider::new();
        let store = UnpublishedOperationStore::new(&provider).await.unwrap();
        let ttl = Duration::from_secs(600);

        store.put(&operation("EiAone", "create"), 0, ttl).await.unwrap();
        store.put(&operation("EiAone", "create"), 0, ttl).await.unwrap();

        assert_eq!(store.get_by_suffix("EiAone").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_suffix_only_touches_that_suffix() {
        let provider = MemStoreProvider::new();
        let store = UnpublishedOperationStore::new(&provider).await.unwrap();
        let ttl = Duration::from_secs(600);

        store.put(&operation("EiAone", "create"), 0, ttl).await.unwrap();
        store.put(&operation("EiAtwo", "create"), 0, ttl).await.unwrap();

        assert_eq!(store.delete_by_suffix("EiAone").await.unwrap(), 1);
        assert!(store.get_by_suffix("EiAone").await.unwrap().is_empty());
        assert_eq!(store.get_by_suffix("EiAtwo").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rows_carry_the_expiry_tag() {
        let provider = MemStoreProvider::new();
        let store = UnpublishedOperationStore::new(&provider).await.unwrap();

        store
            .put(&operation("EiAone", "create"), 0, Duration::from_secs(600))
            .await
            .unwrap();

        let mut iter = store
            .store()
            .query(&[TagExpr::with_name(EXPIRY_TAG)])
            .await
            .unwrap();
        let record = iter.next().await.unwrap().unwrap();
        let expiry: u64 = record
            .tags
            .iter()
            .find(|t| t.name == EXPIRY_TAG)
            .unwrap()
            .value
            .parse()
            .unwrap();
        assert!(expiry > seconds_since_epoch());
    }
}
