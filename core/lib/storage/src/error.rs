use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data not found for key [{0}]")]
    NotFound(String),

    #[error("query not supported by this storage provider: {0}")]
    QueryNotSupported(String),

    #[error("iterator is closed")]
    IteratorClosed,

    #[error("storage failure: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
