//! Protocol version selection. Parameters are registered per genesis
//! time; an anchoring event selects its parameters by exact genesis-time
//! match, never by range, so a replayed event can never pick up rules it
//! was not anchored under.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("protocol parameters are not defined for anchoring events at time [{0}]")]
    ParametersNotDefined(u64),

    #[error("no protocol versions registered")]
    NoVersions,
}

/// Parameters of one protocol version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Anchoring events carrying this genesis time select this version.
    pub genesis_time: u64,

    /// Maximum operations referenced by a single anchor.
    pub max_operations_per_batch: u64,

    /// Maximum size of a single operation request, in bytes.
    pub max_operation_size: u64,
}

/// Immutable, ascending-by-genesis-time registry of protocol versions.
/// Constructed once at startup and shared by reference.
#[derive(Debug)]
pub struct ProtocolVersionClient {
    versions: Vec<ProtocolParameters>,
}

impl ProtocolVersionClient {
    pub fn new(mut versions: Vec<ProtocolParameters>) -> Self {
        versions.sort_by_key(|v| v.genesis_time);
        Self { versions }
    }

    /// Returns the version whose genesis time equals `transaction_time`.
    pub fn get(&self, transaction_time: u64) -> Result<&ProtocolParameters, ProtocolError> {
        self.versions
            .iter()
            .find(|v| v.genesis_time == transaction_time)
            .ok_or(ProtocolError::ParametersNotDefined(transaction_time))
    }

    /// Returns the latest registered version.
    pub fn current(&self) -> Result<&ProtocolParameters, ProtocolError> {
        self.versions.last().ok_or(ProtocolError::NoVersions)
    }
}
