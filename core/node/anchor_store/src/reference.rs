use std::sync::Arc;

use anchor_storage::{
    Store, StoreError, StoreIterator, StoreProvider, Tag, TagExpr, TIME_ADDED_TAG,
};
use anchor_types::time::seconds_since_epoch;
use base64::Engine;

use crate::{store_names, AnchorStoreError};

const ACTIVITY_TYPE_TAG: &str = "activityType";

/// Well-known reference types.
pub mod ref_types {
    /// Latest anchor per DID suffix.
    pub const ANCHOR: &str = "anchor";
    /// Witnesses solicited for an anchor.
    pub const WITNESS: &str = "witness";
    /// Anchor events originating from a remote domain.
    pub const ANCHOR_ORIGIN: &str = "anchor-origin";
}

/// Directed reference edges `(ref_type, object) -> reference`, queried
/// by object and optionally narrowed by the type of the activity that
/// created them.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    store: Arc<dyn Store>,
}

impl ReferenceStore {
    pub async fn new(provider: &dyn StoreProvider) -> Result<Self, AnchorStoreError> {
        let store = provider.open_store(store_names::REFERENCE).await?;
        Ok(Self { store })
    }

    pub async fn add(
        &self,
        ref_type: &str,
        object_iri: &str,
        reference_iri: &str,
        activity_type: Option<&str>,
    ) -> Result<(), AnchorStoreError> {
        let key = reference_key(ref_type, object_iri, reference_iri);

        let mut tags = vec![
            Tag::new(ref_type, encode_iri(object_iri)),
            Tag::new(TIME_ADDED_TAG, seconds_since_epoch().to_string()),
        ];
        if let Some(activity_type) = activity_type {
            tags.push(Tag::new(ACTIVITY_TYPE_TAG, activity_type));
        }

        self.store
            .put(&key, reference_iri.as_bytes(), &tags)
            .await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        ref_type: &str,
        object_iri: &str,
        reference_iri: &str,
    ) -> Result<(), AnchorStoreError> {
        let key = reference_key(ref_type, object_iri, reference_iri);
        self.store.delete(&key).await?;
        Ok(())
    }

    /// References of `object_iri` under `ref_type`, in insertion order.
    pub async fn query(
        &self,
        ref_type: &str,
        object_iri: &str,
    ) -> Result<ReferenceIterator, AnchorStoreError> {
        let iter = self
            .store
            .query(&[TagExpr::equals(ref_type, encode_iri(object_iri))])
            .await?;
        Ok(ReferenceIterator { inner: iter })
    }

    /// Same as [`query`](Self::query), narrowed to references created by
    /// the given activity type. Requires a provider capable of multi-tag
    /// queries; others reject the query outright.
    pub async fn query_by_activity_type(
        &self,
        ref_type: &str,
        object_iri: &str,
        activity_type: &str,
    ) -> Result<ReferenceIterator, AnchorStoreError> {
        if !self.store.supports_multi_tag_queries() {
            return Err(AnchorStoreError::Store(StoreError::QueryNotSupported(
                format!(
                    "provider of store [{}] cannot combine object and activity-type tags",
                    self.store.name()
                ),
            )));
        }

        let iter = self
            .store
            .query(&[
                TagExpr::equals(ref_type, encode_iri(object_iri)),
                TagExpr::equals(ACTIVITY_TYPE_TAG, activity_type),
            ])
            .await?;
        Ok(ReferenceIterator { inner: iter })
    }
}

/// Iterator over reference IRIs, preserving the tagged-store iterator
/// contract.
pub struct ReferenceIterator {
    inner: Box<dyn StoreIterator>,
}

impl std::fmt::Debug for ReferenceIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceIterator").finish_non_exhaustive()
    }
}

impl ReferenceIterator {
    pub async fn next(&mut self) -> Result<Option<String>, AnchorStoreError> {
        let record = self.inner.next().await?;
        match record {
            Some(record) => {
                let iri = String::from_utf8(record.value)
                    .map_err(|_| AnchorStoreError::Corrupted(record.key))?;
                Ok(Some(iri))
            }
            None => Ok(None),
        }
    }

    pub fn total_items(&self) -> usize {
        self.inner.total_items()
    }

    pub fn close(&mut self) -> Result<(), StoreError> {
        self.inner.close()
    }
}

fn reference_key(ref_type: &str, object_iri: &str, reference_iri: &str) -> String {
    format!("{ref_type}|{object_iri}|{reference_iri}").to_lowercase()
}

/// IRIs contain characters that are unsafe in index strings; tag values
/// carry them base64url-encoded.
fn encode_iri(iri: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(iri.to_lowercase())
}

#[cfg(test)]
mod tests {
    use anchor_storage::MemStoreProvider;
    use assert_matches::assert_matches;

    use super::*;

    async fn reference_store() -> ReferenceStore {
        ReferenceStore::new(&MemStoreProvider::new()).await.unwrap()
    }

    #[tokio::test]
    async fn add_then_query() {
        let store = reference_store().await;

        store
            .add(ref_types::ANCHOR, "EiAsuffix", "hl:uEiAfirst", None)
            .await
            .unwrap();
        store
            .add(ref_types::ANCHOR, "EiAsuffix", "hl:uEiAsecond", None)
            .await
            .unwrap();

        let mut iter = store.query(ref_types::ANCHOR, "EiAsuffix").await.unwrap();
        assert_eq!(iter.total_items(), 2);
        assert_eq!(iter.next().await.unwrap().unwrap(), "hl:uEiAfirst");
        assert_eq!(iter.next().await.unwrap().unwrap(), "hl:uEiAsecond");
        assert_eq!(iter.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn ref_types_are_isolated() {
        let store = reference_store().await;

        store
            .add(ref_types::ANCHOR, "EiAsuffix", "hl:uEiAfirst", None)
            .await
            .unwrap();

        let iter = store.query(ref_types::WITNESS, "EiAsuffix").await.unwrap();
        assert_eq!(iter.total_items(), 0);
    }

    #[tokio::test]
    async fn narrows_by_activity_type() {
        let store = reference_store().await;

        store
            .add(
                ref_types::ANCHOR_ORIGIN,
                "https://anchor.domain2.com",
                "https://anchor.domain2.com/events/1",
                Some("Create"),
            )
            .await
            .unwrap();
        store
            .add(
                ref_types::ANCHOR_ORIGIN,
                "https://anchor.domain2.com",
                "https://anchor.domain2.com/events/2",
                Some("Announce"),
            )
            .await
            .unwrap();

        let mut iter = store
            .query_by_activity_type(ref_types::ANCHOR_ORIGIN, "https://anchor.domain2.com", "Create")
            .await
            .unwrap();
        assert_eq!(iter.total_items(), 1);
        assert_eq!(
            iter.next().await.unwrap().unwrap(),
            "https://anchor.domain2.com/events/1"
        );
    }

    #[tokio::test]
    async fn delete_removes_the_edge() {
        let store = reference_store().await;

        store
            .add(ref_types::WITNESS, "hl:uEiAanchor", "https://w1", None)
            .await
            .unwrap();
        store
            .delete(ref_types::WITNESS, "hl:uEiAanchor", "https://w1")
            .await
            .unwrap();

        let iter = store.query(ref_types::WITNESS, "hl:uEiAanchor").await.unwrap();
        assert_eq!(iter.total_items(), 0);
    }

    #[tokio::test]
    async fn keys_are_case_insensitive() {
        let store = reference_store().await;

        store
            .add(ref_types::ANCHOR, "EiAsuffix", "hl:uEiAfirst", None)
            .await
            .unwrap();
        // Same triple in different case overwrites rather than
        // duplicates.
        store
            .add(ref_types::ANCHOR, "EIASUFFIX", "HL:uEiAfirst".to_lowercase().as_str(), None)
            .await
            .unwrap();

        let iter = store.query(ref_types::ANCHOR, "eiasuffix").await.unwrap();
        assert_eq!(iter.total_items(), 1);
    }

    /// A provider without multi-tag support rejects narrowed queries.
    #[tokio::test]
    async fn narrowed_query_requires_multi_tag_capability() {
        #[derive(Debug)]
        struct SingleTagStore(Arc<dyn Store>);

        #[async_trait::async_trait]
        impl Store for SingleTagStore {
            fn name(&self) -> &str {
                self.0.name()
            }
            async fn put(
                &self,
                key: &str,
                value: &[u8],
                tags: &[Tag],
            ) -> Result<(), StoreError> {
                self.0.put(key, value, tags).await
            }
            async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
                self.0.get(key).await
            }
            async fn get_tags(&self, key: &str) -> Result<Vec<Tag>, StoreError> {
                self.0.get_tags(key).await
            }
            async fn delete(&self, key: &str) -> Result<(), StoreError> {
                self.0.delete(key).await
            }
            async fn query(
                &self,
                exprs: &[TagExpr],
            ) -> Result<Box<dyn StoreIterator>, StoreError> {
                self.0.query(exprs).await
            }
            fn supports_multi_tag_queries(&self) -> bool {
                false
            }
        }

        let provider = MemStoreProvider::new();
        let backing = provider.open_store(store_names::REFERENCE).await.unwrap();
        let store = ReferenceStore {
            store: Arc::new(SingleTagStore(backing)),
        };

        assert_matches!(
            store
                .query_by_activity_type(ref_types::ANCHOR_ORIGIN, "https://d", "Create")
                .await,
            Err(AnchorStoreError::Store(StoreError::QueryNotSupported(_)))
        );
    }
}
