//! Tagged key-value storage for the anchor core.
//!
//! Every persisted record carries a set of name/value tags enabling
//! indexed queries. Providers differ in which queries they can serve: a
//! provider that cannot combine tags rejects multi-tag queries with an
//! explicit error instead of scanning.

mod error;
mod expiry;
mod mem;
mod store;

pub use self::{
    error::StoreError,
    expiry::ExpirySweeper,
    mem::{MemStore, MemStoreProvider},
    store::{Record, Store, StoreIterator, StoreProvider, Tag, TagExpr},
};

/// Tag holding the unix time after which a record is swept.
pub const EXPIRY_TAG: &str = "expiryTime";

/// Tag holding the unix time a record was added.
pub const TIME_ADDED_TAG: &str = "timeAdded";
