use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Role of a solicited witness. Batch witnesses accompany each proposal;
/// system witnesses are configured at the domain level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WitnessRole {
    Batch,
    System,
}

impl fmt::Display for WitnessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => f.write_str("batch"),
            Self::System => f.write_str("system"),
        }
    }
}

impl FromStr for WitnessRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "batch" => Ok(Self::Batch),
            "system" => Ok(Self::System),
            other => Err(format!("invalid witness role: {other}")),
        }
    }
}

/// A witness solicited for an anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub uri: String,
    pub role: WitnessRole,
}

/// A witness row of the proof record. `proof` is set once, on receipt of
/// the witness's `Accept`, and never overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessProof {
    pub witness: Witness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<serde_json::Value>,
}

impl WitnessProof {
    pub fn new(uri: impl Into<String>, role: WitnessRole) -> Self {
        Self {
            witness: Witness {
                uri: uri.into(),
                role,
            },
            proof: None,
        }
    }
}

/// State of an anchor within the witness collection machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorStatus {
    Proposed,
    Soliciting,
    Witnessed,
    Published,
    Archived,
    Rejected,
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Proposed => "proposed",
            Self::Soliciting => "soliciting",
            Self::Witnessed => "witnessed",
            Self::Published => "published",
            Self::Archived => "archived",
            Self::Rejected => "rejected",
        };
        f.write_str(value)
    }
}
