use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    store::{Record, Store, StoreIterator, StoreProvider, Tag, TagExpr},
};

#[derive(Clone, Debug)]
struct StoredRecord {
    value: Vec<u8>,
    tags: Vec<Tag>,
    // Monotonic per-store sequence preserving insertion order for queries.
    seq: u64,
}

/// In-process store backed by a map. Supports multi-tag queries.
#[derive(Debug)]
pub struct MemStore {
    name: String,
    inner: RwLock<MemStoreInner>,
}

#[derive(Debug, Default)]
struct MemStoreInner {
    records: BTreeMap<String, StoredRecord>,
    next_seq: u64,
}

impl MemStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: RwLock::new(MemStoreInner::default()),
        }
    }
}

#[async_trait]
impl Store for MemStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, value: &[u8], tags: &[Tag]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        // A rewrite keeps the original insertion position.
        let seq = match inner.records.get(key) {
            Some(existing) => existing.seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };
        inner.records.insert(
            key.to_string(),
            StoredRecord {
                value: value.to_vec(),
                tags: tags.to_vec(),
                seq,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .records
            .get(key)
            .map(|r| r.value.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn get_tags(&self, key: &str) -> Result<Vec<Tag>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .records
            .get(key)
            .map(|r| r.tags.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.records.remove(key);
        Ok(())
    }

    async fn query(&self, exprs: &[TagExpr]) -> Result<Box<dyn StoreIterator>, StoreError> {
        let inner = self.inner.read().await;

        let mut matches: Vec<(&String, &StoredRecord)> = inner
            .records
            .iter()
            .filter(|(_, record)| {
                exprs.iter().all(|expr| {
                    record.tags.iter().any(|tag| {
                        tag.name == expr.name
                            && expr.value.as_ref().map_or(true, |v| &tag.value == v)
                    })
                })
            })
            .collect();
        matches.sort_by_key(|(_, record)| record.seq);

        let records: VecDeque<Record> = matches
            .into_iter()
            .map(|(key, record)| Record {
                key: key.clone(),
                value: record.value.clone(),
                tags: record.tags.clone(),
            })
            .collect();

        Ok(Box::new(MemIterator::new(records)))
    }

    fn supports_multi_tag_queries(&self) -> bool {
        true
    }
}

struct MemIterator {
    records: VecDeque<Record>,
    total: usize,
    closed: bool,
}

impl MemIterator {
    fn new(records: VecDeque<Record>) -> Self {
        let total = records.len();
        Self {
            records,
            total,
            closed: false,
        }
    }
}

#[async_trait]
impl StoreIterator for MemIterator {
    async fn next(&mut self) -> Result<Option<Record>, StoreError> {
        if self.closed {
            return Err(StoreError::IteratorClosed);
        }
        let record = self.records.pop_front();
        if record.is_none() {
            // Exhaustion releases the cursor.
            self.closed = true;
        }
        Ok(record)
    }

    fn total_items(&self) -> usize {
        self.total
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.records.clear();
        Ok(())
    }
}

/// Shared in-process provider. Stores are created on first open and
/// shared between openers, which lets multiple components coordinate
/// through the same store in tests and single-node deployments.
#[derive(Debug, Default)]
pub struct MemStoreProvider {
    stores: RwLock<HashMap<String, Arc<MemStore>>>,
}

impl MemStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreProvider for MemStoreProvider {
    async fn open_store(&self, name: &str) -> Result<Arc<dyn Store>, StoreError> {
        let mut stores = self.stores.write().await;
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemStore::new(name)));
        Ok(Arc::clone(store) as Arc<dyn Store>)
    }
}
