use std::sync::Arc;

use anchor_types::hashlink::{Hashlink, HL_PREFIX};

use crate::{CasClient, CasError};

/// Result of a façade write: the content identifier plus the
/// deployment-local retrieval hint, when one is configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteResult {
    pub cid: String,
    pub hint: Option<String>,
}

impl WriteResult {
    /// The hashlink form of the written content, carrying the hint as
    /// metadata when present.
    pub fn hashlink(&self, content: &[u8]) -> Hashlink {
        match &self.hint {
            Some(hint) => Hashlink::with_links(content, vec![format!("{hint}/{}", self.cid)]),
            None => Hashlink::new(content),
        }
    }
}

/// Read/write façade over a CAS backend. Reads accept either a raw
/// content identifier or a hashlink; the segment up to the first `:`
/// after `hl:` is the canonical identity, metadata segments are hints.
#[derive(Debug, Clone)]
pub struct CasResolver {
    client: Arc<dyn CasClient>,
    hint: Option<String>,
}

impl CasResolver {
    pub fn new(client: Arc<dyn CasClient>, hint: Option<String>) -> Self {
        Self { client, hint }
    }

    pub async fn write(&self, content: &[u8]) -> Result<WriteResult, CasError> {
        let cid = self.client.write(content).await?;
        Ok(WriteResult {
            cid,
            hint: self.hint.clone(),
        })
    }

    pub async fn read(&self, id: &str) -> Result<Vec<u8>, CasError> {
        let cid = if id.starts_with(HL_PREFIX) {
            let hashlink =
                Hashlink::parse(id).map_err(|e| CasError::InvalidCid(e.to_string()))?;
            if !hashlink.links().is_empty() {
                tracing::debug!(
                    "Resolving [{id}] by canonical hash; ignoring {} retrieval hints",
                    hashlink.links().len()
                );
            }
            hashlink.resource_hash().to_string()
        } else {
            id.to_string()
        };

        self.client.read(&cid).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::MemCasClient;

    fn resolver(hint: Option<&str>) -> CasResolver {
        CasResolver::new(Arc::new(MemCasClient::new()), hint.map(str::to_string))
    }

    #[tokio::test]
    async fn reads_by_cid_and_by_hashlink() {
        let resolver = resolver(None);
        let content = b"batch file";
        let result = resolver.write(content).await.unwrap();

        assert_eq!(resolver.read(&result.cid).await.unwrap(), content);

        let hl = result.hashlink(content).to_string();
        assert_eq!(resolver.read(&hl).await.unwrap(), content);
    }

    #[tokio::test]
    async fn reads_hashlink_with_metadata() {
        let resolver = resolver(Some("https://anchor.domain1.com/cas"));
        let content = b"batch file";
        let result = resolver.write(content).await.unwrap();

        let hl = result.hashlink(content);
        assert!(!hl.links().is_empty());
        assert_eq!(resolver.read(&hl.to_string()).await.unwrap(), content);
    }

    #[tokio::test]
    async fn malformed_hashlink_is_invalid() {
        let resolver = resolver(None);
        assert_matches!(resolver.read("hl:abc").await, Err(CasError::InvalidCid(_)));
    }

    #[tokio::test]
    async fn empty_write_is_rejected() {
        let resolver = resolver(None);
        assert_matches!(resolver.write(b"").await, Err(CasError::EmptyContent));
    }
}
