use anchor_config::CasConfig;
use anchor_types::hashlink;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{CasClient, CasError};

/// CAS backend speaking the webcas protocol: `POST <base>/cas` writes,
/// `GET <base>/cas/<cid>` reads.
#[derive(Debug, Clone)]
pub struct HttpCasClient {
    base_url: String,
    client: Client,
}

impl HttpCasClient {
    pub fn new(config: &CasConfig) -> anyhow::Result<Self> {
        let base_url = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CAS endpoint is not configured"))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CasClient for HttpCasClient {
    async fn write(&self, content: &[u8]) -> Result<String, CasError> {
        if content.is_empty() {
            return Err(CasError::EmptyContent);
        }

        let url = format!("{}/cas", self.base_url);
        let res = self
            .client
            .post(&url)
            .body(content.to_vec())
            .send()
            .await
            .map_err(|e| CasError::Transient(e.into()))?;

        if res.status().is_server_error() {
            return Err(CasError::Transient(anyhow::anyhow!(
                "CAS write failed: {}",
                res.status()
            )));
        }
        if !res.status().is_success() {
            return Err(CasError::InvalidCid(format!(
                "CAS write rejected: {}",
                res.status()
            )));
        }

        let cid = res
            .text()
            .await
            .map_err(|e| CasError::Transient(e.into()))?;
        hashlink::validate_multihash(cid.trim()).map_err(CasError::InvalidCid)?;
        Ok(cid.trim().to_string())
    }

    async fn read(&self, cid: &str) -> Result<Vec<u8>, CasError> {
        hashlink::validate_multihash(cid).map_err(CasError::InvalidCid)?;

        let url = format!("{}/cas/{cid}", self.base_url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CasError::Transient(e.into()))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Err(CasError::NotFound(cid.to_string()));
        }
        if res.status().is_server_error() {
            return Err(CasError::Transient(anyhow::anyhow!(
                "CAS read failed: {}",
                res.status()
            )));
        }
        if !res.status().is_success() {
            return Err(CasError::InvalidCid(format!(
                "CAS read rejected: {}",
                res.status()
            )));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| CasError::Transient(e.into()))?;
        Ok(bytes.to_vec())
    }
}
