use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::StoreError;

/// A name/value pair indexed by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One term of a query. A `None` value matches any record carrying the
/// tag name; terms are AND-combined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagExpr {
    pub name: String,
    pub value: Option<String>,
}

impl TagExpr {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// A stored record as returned by queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,
    pub tags: Vec<Tag>,
}

/// Single-pass, finite, non-restartable query result. The iterator owns
/// its underlying cursor and releases it on [`close`](Self::close) or on
/// exhaustion, whichever comes first. `close` is idempotent; calls after
/// `close` are permitted to fail.
#[async_trait]
pub trait StoreIterator: Send {
    async fn next(&mut self) -> Result<Option<Record>, StoreError>;

    /// The unpaged size of the query result, regardless of how far the
    /// iterator has advanced.
    fn total_items(&self) -> usize;

    fn close(&mut self) -> Result<(), StoreError>;
}

/// A named store of tagged records.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn put(&self, key: &str, value: &[u8], tags: &[Tag]) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn get_tags(&self, key: &str) -> Result<Vec<Tag>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Queries records matching all expressions, in insertion order.
    async fn query(&self, exprs: &[TagExpr]) -> Result<Box<dyn StoreIterator>, StoreError>;

    /// Whether this provider can serve queries combining more than one
    /// tag expression.
    fn supports_multi_tag_queries(&self) -> bool;
}

/// Opens named stores of a shared backing provider.
#[async_trait]
pub trait StoreProvider: Send + Sync + fmt::Debug {
    async fn open_store(&self, name: &str) -> Result<Arc<dyn Store>, StoreError>;
}
