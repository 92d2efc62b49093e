use serde::{Deserialize, Serialize};

/// Status of a VCT log entry. The only permitted transition is
/// `Success -> Failed`, performed in bulk by the fail-from operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryStatus {
    Success,
    Failed,
}

impl LogEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// An entry of the append-only witnessed-anchor log, identified by
/// `(log_url, index)`. `leaf_input` is immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: u64,
    pub leaf_input: Vec<u8>,
    pub status: LogEntryStatus,
}
