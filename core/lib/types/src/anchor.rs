use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Links a DID suffix touched by a batch to the anchor that last touched
/// it. `previous_anchor` is absent for the suffix's create operation and
/// holds the hashlink of the previous anchor otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixAnchor {
    pub suffix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_anchor: Option<String>,
}

/// The batch payload anchored by a single anchor event.
///
/// `previous_anchors` is ordered; a suffix may appear at most once per
/// batch. `published` is carried by the event envelope rather than the
/// linkset, so it is optional on the decoded side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPayload {
    pub namespace: String,
    pub version: u64,
    pub core_index: String,
    pub publisher_origin: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    pub operation_count: u64,
    pub previous_anchors: Vec<SuffixAnchor>,
}

#[derive(Debug, Error, PartialEq)]
pub enum AnchorDataError {
    #[error("expected 2 parts in anchor data [{0}]")]
    PartCount(String),

    #[error("operation count in anchor data [{0}] must be a positive integer")]
    InvalidOperationCount(String),
}

/// The compact `<operation-count>.<core-index-uri>` form recorded in log
/// leaves and anchor credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorData {
    pub operation_count: u64,
    pub core_index_file_uri: String,
}

impl FromStr for AnchorData {
    type Err = AnchorDataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split('.').collect();
        if parts.len() != 2 {
            return Err(AnchorDataError::PartCount(value.to_string()));
        }

        let count_part = parts[0];
        // "0" and zero-padded counts are not canonical and are rejected.
        if count_part.is_empty() || count_part.starts_with('0') {
            return Err(AnchorDataError::InvalidOperationCount(value.to_string()));
        }

        let operation_count = count_part
            .parse::<u64>()
            .map_err(|_| AnchorDataError::InvalidOperationCount(value.to_string()))?;

        Ok(Self {
            operation_count,
            core_index_file_uri: parts[1].to_string(),
        })
    }
}

impl fmt::Display for AnchorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.operation_count, self.core_index_file_uri)
    }
}
