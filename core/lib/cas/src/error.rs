use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasError {
    #[error("content not found [{0}]")]
    NotFound(String),

    #[error("empty content")]
    EmptyContent,

    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("transient CAS failure: {0}")]
    Transient(#[source] anyhow::Error),
}

impl CasError {
    /// Transient failures are retried by upstream loops; everything else
    /// surfaces to the caller.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
