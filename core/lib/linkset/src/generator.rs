use std::fmt;

use anchor_types::{
    hashlink::Hashlink, AnchorPayload, Item, Link, Linkset, SuffixAnchor, VerifiableCredential,
};
use url::Url;

use crate::LinksetError;

/// Label standing in for the previous-anchor multihash in the `href` of a
/// DID's create operation.
pub const UNPUBLISHED_LABEL: &str = "uAAA";

/// A versioned codec between a batch payload and its content object.
/// Generators form a small closed set keyed by ID; new versions are new
/// generators.
pub trait Generator: Send + Sync + fmt::Debug {
    fn id(&self) -> &Url;

    fn namespace(&self) -> &str;

    fn version(&self) -> u64;

    /// Encodes a payload into its abstract content object.
    fn create_content_object(
        &self,
        payload: &AnchorPayload,
    ) -> Result<serde_json::Value, LinksetError>;

    /// Decodes a content object back into a payload. `core_index_uri`,
    /// when non-empty, must match the anchor of the linkset; `parents`
    /// is the deduped parent list of the surrounding event, used to
    /// validate item references.
    fn create_payload(
        &self,
        doc: &serde_json::Value,
        core_index_uri: &str,
        parents: &[String],
    ) -> Result<AnchorPayload, LinksetError>;

    /// Verifies that the credential commits to the given linkset bytes.
    fn validate_anchor_credential(
        &self,
        vc: &VerifiableCredential,
        linkset_bytes: &[u8],
    ) -> Result<(), LinksetError>;
}

/// Generator v1 for the `did:anchor` method.
#[derive(Debug)]
pub struct AnchorLinksetGenerator {
    id: Url,
    namespace: String,
    version: u64,
}

impl AnchorLinksetGenerator {
    pub fn new() -> Self {
        Self {
            id: Url::parse("https://w3id.org/anchorlink#v1").expect("static URL is valid"),
            namespace: "did:anchor".to_string(),
            version: 1,
        }
    }
}

impl Default for AnchorLinksetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for AnchorLinksetGenerator {
    fn id(&self) -> &Url {
        &self.id
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn create_content_object(
        &self,
        payload: &AnchorPayload,
    ) -> Result<serde_json::Value, LinksetError> {
        if payload.core_index.is_empty() {
            return Err(LinksetError::InvalidPayload(
                "payload is missing the core index locator".to_string(),
            ));
        }
        if payload.previous_anchors.is_empty() {
            return Err(LinksetError::InvalidPayload(
                "payload has no suffix anchors".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(payload.previous_anchors.len());
        for suffix_anchor in &payload.previous_anchors {
            items.push(self.create_item(suffix_anchor)?);
        }

        let linkset = Linkset::new(Link {
            anchor: payload.core_index.clone(),
            author: Some(payload.publisher_origin.to_string()),
            profile: self.id.to_string(),
            item: items,
        });

        serde_json::to_value(&linkset)
            .map_err(|e| LinksetError::InvalidPayload(format!("linkset is not serializable: {e}")))
    }

    fn create_payload(
        &self,
        doc: &serde_json::Value,
        core_index_uri: &str,
        parents: &[String],
    ) -> Result<AnchorPayload, LinksetError> {
        let linkset: Linkset = serde_json::from_value(doc.clone())
            .map_err(|e| LinksetError::InvalidContentObject(e.to_string()))?;

        let link = linkset.link().ok_or_else(|| {
            LinksetError::InvalidContentObject("linkset has no links".to_string())
        })?;

        if link.profile != self.id.as_str() {
            return Err(LinksetError::InvalidContentObject(format!(
                "profile [{}] does not match generator [{}]",
                link.profile, self.id
            )));
        }
        if !core_index_uri.is_empty() && link.anchor != core_index_uri {
            return Err(LinksetError::InvalidContentObject(format!(
                "anchor [{}] does not match core index [{core_index_uri}]",
                link.anchor
            )));
        }
        if link.item.is_empty() {
            return Err(LinksetError::InvalidContentObject(
                "linkset has no items".to_string(),
            ));
        }

        let author = link.author.as_deref().ok_or_else(|| {
            LinksetError::InvalidContentObject("linkset has no author".to_string())
        })?;
        let publisher_origin = Url::parse(author)
            .map_err(|e| LinksetError::InvalidContentObject(format!("invalid author: {e}")))?;

        let mut previous_anchors = Vec::with_capacity(link.item.len());
        for item in &link.item {
            previous_anchors.push(self.parse_item(item, parents)?);
        }

        Ok(AnchorPayload {
            namespace: self.namespace.clone(),
            version: self.version,
            core_index: link.anchor.clone(),
            publisher_origin,
            published: None,
            operation_count: link.item.len() as u64,
            previous_anchors,
        })
    }

    fn validate_anchor_credential(
        &self,
        vc: &VerifiableCredential,
        linkset_bytes: &[u8],
    ) -> Result<(), LinksetError> {
        let subject_id = vc
            .credential_subject
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| {
                LinksetError::InvalidCredential("credential subject has no id".to_string())
            })?;

        let expected = Hashlink::new(linkset_bytes);
        let actual = Hashlink::parse(subject_id)
            .map_err(|e| LinksetError::InvalidCredential(e.to_string()))?;

        if actual.resource_hash() != expected.resource_hash() {
            return Err(LinksetError::InvalidCredential(format!(
                "credential subject [{subject_id}] does not match the anchor linkset"
            )));
        }
        Ok(())
    }
}

impl AnchorLinksetGenerator {
    fn create_item(&self, suffix_anchor: &SuffixAnchor) -> Result<Item, LinksetError> {
        let (label, previous) = match &suffix_anchor.previous_anchor {
            Some(previous) => {
                let hashlink = Hashlink::parse(previous).map_err(|e| {
                    LinksetError::InvalidPayload(format!(
                        "invalid previous anchor for suffix [{}]: {e}",
                        suffix_anchor.suffix
                    ))
                })?;
                (hashlink.resource_hash().to_string(), vec![previous.clone()])
            }
            None => (UNPUBLISHED_LABEL.to_string(), Vec::new()),
        };

        Ok(Item {
            href: format!("{}:{label}:{}", self.namespace, suffix_anchor.suffix),
            previous,
        })
    }

    fn parse_item(&self, item: &Item, parents: &[String]) -> Result<SuffixAnchor, LinksetError> {
        let rest = item.href.strip_prefix(&format!("{}:", self.namespace)).ok_or_else(|| {
            LinksetError::InvalidContentObject(format!(
                "item [{}] is outside namespace [{}]",
                item.href, self.namespace
            ))
        })?;

        let (_label, suffix) = rest.rsplit_once(':').ok_or_else(|| {
            LinksetError::InvalidContentObject(format!("malformed item href [{}]", item.href))
        })?;

        let previous_anchor = item.previous.first().cloned();
        if let Some(previous) = &previous_anchor {
            if !parents.is_empty() && !parents.contains(previous) {
                return Err(LinksetError::InvalidContentObject(format!(
                    "previous anchor [{previous}] of item [{}] is not among the event parents",
                    item.href
                )));
            }
        }

        Ok(SuffixAnchor {
            suffix: suffix.to_string(),
            previous_anchor,
        })
    }
}
