use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Prefix of every hashlink identifier.
pub const HL_PREFIX: &str = "hl:";

/// Multibase prefix for base64url (no padding) encoded multihashes.
const MULTIBASE_BASE64URL: char = 'u';

/// SHA2-256 multihash header: code 0x12, digest length 0x20.
const MULTIHASH_SHA2_256: [u8; 2] = [0x12, 0x20];

#[derive(Debug, Error)]
pub enum HashlinkError {
    #[error("invalid hashlink [{0}]: missing {HL_PREFIX} prefix")]
    MissingPrefix(String),

    #[error("invalid hashlink [{0}]: {1}")]
    InvalidResourceHash(String, String),

    #[error("invalid hashlink metadata [{0}]: {1}")]
    InvalidMetadata(String, String),
}

/// A CAS reference of the form `hl:<multihash>[:<metadata>]`.
///
/// The segment up to the first `:` after the prefix is the canonical
/// identity of the content; the optional metadata segment carries
/// base64url-encoded alternative retrieval URIs and is treated purely as
/// a hint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashlink {
    resource_hash: String,
    links: Vec<String>,
}

impl Hashlink {
    /// Computes the hashlink of the given content.
    pub fn new(content: &[u8]) -> Self {
        Self {
            resource_hash: multihash(content),
            links: Vec::new(),
        }
    }

    /// Computes the hashlink of the given content, attaching alternative
    /// retrieval URIs as metadata.
    pub fn with_links(content: &[u8], links: Vec<String>) -> Self {
        Self {
            resource_hash: multihash(content),
            links,
        }
    }

    /// Parses `hl:<multihash>` or `hl:<multihash>:<metadata>`. Anything
    /// past the metadata segment is rejected.
    pub fn parse(value: &str) -> Result<Self, HashlinkError> {
        let rest = value
            .strip_prefix(HL_PREFIX)
            .ok_or_else(|| HashlinkError::MissingPrefix(value.to_string()))?;

        let mut parts = rest.splitn(2, ':');
        let resource_hash = parts.next().unwrap_or_default();

        validate_multihash(resource_hash)
            .map_err(|e| HashlinkError::InvalidResourceHash(value.to_string(), e))?;

        let links = match parts.next() {
            Some(metadata) => decode_metadata(metadata)
                .map_err(|e| HashlinkError::InvalidMetadata(value.to_string(), e))?,
            None => Vec::new(),
        };

        Ok(Self {
            resource_hash: resource_hash.to_string(),
            links,
        })
    }

    /// The canonical content identity (a multibase-encoded multihash).
    pub fn resource_hash(&self) -> &str {
        &self.resource_hash
    }

    /// Alternative retrieval URIs carried as metadata, possibly empty.
    pub fn links(&self) -> &[String] {
        &self.links
    }
}

impl fmt::Display for Hashlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.links.is_empty() {
            write!(f, "{HL_PREFIX}{}", self.resource_hash)
        } else {
            write!(
                f,
                "{HL_PREFIX}{}:{}",
                self.resource_hash,
                encode_metadata(&self.links)
            )
        }
    }
}

/// Computes the multibase(base64url) SHA2-256 multihash of the content.
pub fn multihash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);

    let mut bytes = Vec::with_capacity(2 + digest.len());
    bytes.extend_from_slice(&MULTIHASH_SHA2_256);
    bytes.extend_from_slice(&digest);

    format!(
        "{MULTIBASE_BASE64URL}{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    )
}

/// Checks that the value is a well-formed multibase(base64url) SHA2-256
/// multihash.
pub fn validate_multihash(value: &str) -> Result<(), String> {
    let encoded = value
        .strip_prefix(MULTIBASE_BASE64URL)
        .ok_or_else(|| format!("unsupported multibase prefix in [{value}]"))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| format!("multihash is not base64url: {e}"))?;

    if bytes.len() != 34 || bytes[..2] != MULTIHASH_SHA2_256 {
        return Err("multihash is not a SHA2-256 multihash".to_string());
    }

    Ok(())
}

fn encode_metadata(links: &[String]) -> String {
    let bytes = serde_json::to_vec(links).expect("links are serializable");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_metadata(metadata: &str) -> Result<Vec<String>, String> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(metadata)
        .map_err(|e| format!("metadata is not base64url: {e}"))?;

    serde_json::from_slice(&bytes).map_err(|e| format!("metadata is not a URI list: {e}"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn round_trips_without_metadata() {
        let hl = Hashlink::new(b"content");
        let parsed = Hashlink::parse(&hl.to_string()).unwrap();
        assert_eq!(parsed, hl);
        assert!(parsed.links().is_empty());
    }

    #[test]
    fn round_trips_with_metadata() {
        let hl = Hashlink::with_links(
            b"content",
            vec!["https://cas.example.com/cas".to_string()],
        );
        let parsed = Hashlink::parse(&hl.to_string()).unwrap();
        assert_eq!(parsed.resource_hash(), hl.resource_hash());
        assert_eq!(parsed.links(), hl.links());
    }

    #[test]
    fn same_content_same_identity() {
        let plain = Hashlink::new(b"content");
        let hinted = Hashlink::with_links(b"content", vec!["https://alt".to_string()]);
        assert_eq!(plain.resource_hash(), hinted.resource_hash());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_matches!(
            Hashlink::parse("uEiAabc"),
            Err(HashlinkError::MissingPrefix(_))
        );
    }

    #[test]
    fn rejects_bad_resource_hash() {
        assert_matches!(
            Hashlink::parse("hl:abc"),
            Err(HashlinkError::InvalidResourceHash(..))
        );
    }

    #[test]
    fn rejects_bad_metadata() {
        let hl = Hashlink::new(b"content");
        let value = format!("{hl}:!!not-base64!!");
        assert_matches!(
            Hashlink::parse(&value),
            Err(HashlinkError::InvalidMetadata(..))
        );
    }
}
