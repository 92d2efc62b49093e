//! Witness collection for proposed anchors, and the batch writer that
//! feeds it.
//!
//! An anchor moves through `Proposed -> Soliciting -> Witnessed ->
//! Published -> Archived`; an anchor whose policy cannot be satisfied
//! within the resolicitation budget ends in `Rejected`. Transitions of
//! one anchor are serialized by a keyed lock on its hashlink;
//! independent anchors proceed concurrently.

mod collector;
mod key_lock;
mod metrics;
mod record;
mod vct;
mod writer;

pub use self::{
    collector::WitnessCollector,
    key_lock::KeyLock,
    record::{AnchorWitnessRecord, WitnessRecordStore, WITNESS_STORE},
    vct::{CredentialSigner, SignedTimestampVerifier, VctClient, VctError, VctResponse},
    writer::AnchorWriter,
};

use thiserror::Error;

use anchor_cas::CasError;
use anchor_linkset::LinksetError;
use anchor_policy::PolicyStoreError;
use anchor_storage::StoreError;
use anchor_store::AnchorStoreError;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("anchor not found [{0}]")]
    AnchorNotFound(String),

    #[error("witness [{witness}] was not solicited for anchor [{anchor}]")]
    UnknownWitness { witness: String, anchor: String },

    #[error("witness policy cannot be satisfied for anchor [{0}]")]
    PolicyUnsatisfiable(String),

    #[error("malformed witness record: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Linkset(#[from] LinksetError),

    #[error(transparent)]
    Cas(#[from] CasError),

    #[error(transparent)]
    Vct(#[from] VctError),

    #[error(transparent)]
    Policy(#[from] PolicyStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    AnchorStore(#[from] AnchorStoreError),
}

impl WitnessError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Cas(err) => err.is_retriable(),
            Self::Vct(err) => err.is_retriable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
