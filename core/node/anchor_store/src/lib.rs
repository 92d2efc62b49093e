//! Indexed persistence for the anchoring core: federated activities,
//! reference edges between objects, per-suffix unpublished operations
//! and the witnessed-anchor log, all layered over the tagged store
//! abstraction.

mod activity;
mod log_entries;
mod outbox;
mod reference;
mod unpublished;

pub use self::{
    activity::ActivityStore,
    log_entries::{LogEntryIterator, LogEntryStore},
    outbox::Outbox,
    reference::{ref_types, ReferenceIterator, ReferenceStore},
    unpublished::UnpublishedOperationStore,
};

use thiserror::Error;

use anchor_storage::StoreError;

/// Names of the logical stores.
pub mod store_names {
    pub const ACTIVITY: &str = "activity";
    pub const REFERENCE: &str = "activitypub-ref";
    pub const UNPUBLISHED_OPERATION: &str = "unpublished-operation";
    pub const LOG_ENTRY: &str = "log-entry";
}

#[derive(Debug, Error)]
pub enum AnchorStoreError {
    #[error("number of entries [{got}] does not match the expected range size [{expected}]")]
    EntryCountMismatch { got: usize, expected: usize },

    #[error("malformed stored record [{0}]")]
    Corrupted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
