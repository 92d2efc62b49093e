use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    Idle,
    Running,
}

/// The per-task lease record. At any instant at most one holder exists
/// per task id; the holder transitions only when the incumbent's
/// timestamp goes stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskPermit {
    pub task_id: String,
    pub holder: String,
    pub status: PermitStatus,
    pub updated_unix: u64,
}
