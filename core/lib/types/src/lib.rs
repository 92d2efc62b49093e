//! Shared domain types for the anchor core: payloads, linksets, anchor
//! events, witness records, log entries and the hashlink identifier form
//! used for every CAS reference.

pub mod activity;
pub mod anchor;
pub mod hashlink;
pub mod linkset;
pub mod log;
pub mod operation;
pub mod time;
pub mod witness;

pub use self::{
    activity::Activity,
    anchor::{AnchorData, AnchorDataError, AnchorPayload, SuffixAnchor},
    hashlink::{Hashlink, HashlinkError},
    linkset::{AnchorEvent, Attachment, Item, Link, Linkset, VerifiableCredential},
    log::{LogEntry, LogEntryStatus},
    operation::{OperationMessage, QueuedOperation},
    witness::{AnchorStatus, Witness, WitnessProof, WitnessRole},
};
