use std::collections::HashMap;

use anchor_types::hashlink;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CasClient, CasError};

/// In-process CAS backend for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct MemCasClient {
    content: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemCasClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CasClient for MemCasClient {
    async fn write(&self, content: &[u8]) -> Result<String, CasError> {
        if content.is_empty() {
            return Err(CasError::EmptyContent);
        }

        let cid = hashlink::multihash(content);
        self.content
            .write()
            .await
            .insert(cid.clone(), content.to_vec());
        Ok(cid)
    }

    async fn read(&self, cid: &str) -> Result<Vec<u8>, CasError> {
        hashlink::validate_multihash(cid).map_err(CasError::InvalidCid)?;

        self.content
            .read()
            .await
            .get(cid)
            .cloned()
            .ok_or_else(|| CasError::NotFound(cid.to_string()))
    }
}
