use std::{fmt, sync::Arc};

use anchor_config::VctConfig;
use anchor_types::VerifiableCredential;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Webfinger property under which a log publishes its key.
const PUBLIC_KEY_PROPERTY: &str = "https://w3id.org/security#publicKey";

#[derive(Debug, Error)]
pub enum VctError {
    #[error("transient VCT failure: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("signed timestamp verification failed: {0}")]
    Verification(String),

    #[error("invalid credential: {0}")]
    Validation(String),
}

impl VctError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Response of a log to a submitted credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VctResponse {
    pub svct_version: u8,
    pub id: String,
    pub timestamp_millis: u64,
    pub signature: String,
}

/// Signs an embedded proof on an anchor credential. Key management is an
/// external collaborator; only the signing seam is consumed here.
pub trait CredentialSigner: Send + Sync + fmt::Debug {
    fn sign(
        &self,
        credential: &VerifiableCredential,
        created: DateTime<Utc>,
        domain: &str,
    ) -> anyhow::Result<serde_json::Value>;
}

/// Verifies a log's signed timestamp over credential bytes against the
/// log's published key.
pub trait SignedTimestampVerifier: Send + Sync + fmt::Debug {
    fn verify(
        &self,
        response: &VctResponse,
        log_public_key: &[u8],
        credential_bytes: &[u8],
    ) -> anyhow::Result<()>;
}

/// Client of a verifiable-credential transparency log. When no endpoint
/// is configured, submission is skipped and a local proof is attached
/// instead.
#[derive(Debug, Clone)]
pub struct VctClient {
    config: VctConfig,
    http: Client,
    signer: Arc<dyn CredentialSigner>,
    verifier: Arc<dyn SignedTimestampVerifier>,
}

impl VctClient {
    pub fn new(
        config: VctConfig,
        signer: Arc<dyn CredentialSigner>,
        verifier: Arc<dyn SignedTimestampVerifier>,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            config,
            http,
            signer,
            verifier,
        })
    }

    /// Submits the credential to the log, verifies the returned signed
    /// timestamp, and returns the credential augmented with a proof
    /// whose `created` equals the log's timestamp.
    pub async fn add_proof(
        &self,
        credential_bytes: &[u8],
    ) -> Result<VerifiableCredential, VctError> {
        let mut credential: VerifiableCredential = serde_json::from_slice(credential_bytes)
            .map_err(|e| VctError::Validation(e.to_string()))?;

        let Some(endpoint) = self.config.endpoint.clone() else {
            tracing::debug!("No VCT endpoint configured; attaching a local proof");
            let proof = self
                .signer
                .sign(&credential, Utc::now(), "local")
                .map_err(|e| VctError::Validation(e.to_string()))?;
            credential.proof.push(proof);
            return Ok(credential);
        };

        let response = self.submit(&endpoint, credential_bytes).await?;

        let created = DateTime::<Utc>::from_timestamp_millis(response.timestamp_millis as i64)
            .ok_or_else(|| {
                VctError::Validation(format!(
                    "log returned an invalid timestamp [{}]",
                    response.timestamp_millis
                ))
            })?;

        let log_key = self.fetch_log_key(&endpoint).await?;
        self.verifier
            .verify(&response, &log_key, credential_bytes)
            .map_err(|e| VctError::Verification(e.to_string()))?;

        let proof = self
            .signer
            .sign(&credential, created, &endpoint)
            .map_err(|e| VctError::Validation(e.to_string()))?;
        credential.proof.push(proof);
        Ok(credential)
    }

    async fn submit(
        &self,
        endpoint: &str,
        credential_bytes: &[u8],
    ) -> Result<VctResponse, VctError> {
        let mut request = self
            .http
            .post(format!("{endpoint}/v1/add-vc"))
            .body(credential_bytes.to_vec());
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| VctError::Transient(e.into()))?;

        if res.status().is_server_error() || res.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(VctError::Transient(anyhow::anyhow!(
                "log rejected submission: {}",
                res.status()
            )));
        }
        if !res.status().is_success() {
            return Err(VctError::Validation(format!(
                "log rejected submission: {}",
                res.status()
            )));
        }

        res.json::<VctResponse>()
            .await
            .map_err(|e| VctError::Validation(e.to_string()))
    }

    /// Fetches the log's published key over webfinger.
    async fn fetch_log_key(&self, endpoint: &str) -> Result<Vec<u8>, VctError> {
        let url = format!("{endpoint}/.well-known/webfinger?resource={endpoint}");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| VctError::Transient(e.into()))?;
        if !res.status().is_success() {
            return Err(VctError::Transient(anyhow::anyhow!(
                "webfinger lookup failed: {}",
                res.status()
            )));
        }

        let doc: serde_json::Value = res
            .json()
            .await
            .map_err(|e| VctError::Validation(e.to_string()))?;

        let encoded = doc
            .get("properties")
            .and_then(|p| p.get(PUBLIC_KEY_PROPERTY))
            .and_then(|k| k.as_str())
            .ok_or_else(|| {
                VctError::Validation("webfinger document has no public key".to_string())
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VctError::Validation(format!("log key is not base64: {e}")))
    }
}
