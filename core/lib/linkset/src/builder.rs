use std::sync::Arc;

use anchor_types::{
    hashlink::Hashlink,
    linkset::{ANCHOR_EVENT_CONTEXT, ANCHOR_EVENT_TYPE, ANCHOR_OBJECT_TYPE},
    AnchorEvent, AnchorPayload, Attachment, VerifiableCredential,
};
use chrono::Utc;

use crate::{LinksetError, Registry};

/// A built anchor: the replication event plus the canonical linkset bytes
/// it commits to.
#[derive(Clone, Debug)]
pub struct BuiltAnchor {
    pub event: AnchorEvent,
    pub linkset_bytes: Vec<u8>,
    pub hashlink: Hashlink,
}

/// Builds anchor events from batch payloads and reverses published events
/// back into payloads, dispatching through the generator registry.
#[derive(Debug, Clone)]
pub struct AnchorBuilder {
    registry: Arc<Registry>,
}

impl AnchorBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn build(
        &self,
        payload: &AnchorPayload,
        witness: Option<VerifiableCredential>,
    ) -> Result<BuiltAnchor, LinksetError> {
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

        let generator = self
            .registry
            .get_by_namespace_and_version(&payload.namespace, payload.version)?;

        let content_object = generator.create_content_object(payload)?;
        let linkset_bytes = serde_json::to_vec(&content_object)
            .map_err(|e| LinksetError::InvalidPayload(format!("linkset is not serializable: {e}")))?;
        let hashlink = Hashlink::new(&linkset_bytes);

        let event = AnchorEvent {
            context: vec![ANCHOR_EVENT_CONTEXT.to_string()],
            event_type: ANCHOR_EVENT_TYPE.to_string(),
            index: hashlink.to_string(),
            attachment: vec![Attachment {
                attachment_type: ANCHOR_OBJECT_TYPE.to_string(),
                url: hashlink.to_string(),
                generator: generator.id().to_string(),
                content_object,
                witness,
            }],
            attributed_to: payload.publisher_origin.to_string(),
            parent: dedup_parents(payload),
            published: payload.published.unwrap_or_else(Utc::now),
            url: hashlink.to_string(),
        };

        Ok(BuiltAnchor {
            event,
            linkset_bytes,
            hashlink,
        })
    }

    /// Reconstructs the batch payload of a replicated anchor event.
    pub fn payload_from_event(&self, event: &AnchorEvent) -> Result<AnchorPayload, LinksetError> {
        let attachment = event.anchor_object().ok_or_else(|| {
            LinksetError::InvalidContentObject("event has no anchor object".to_string())
        })?;

        let generator = self.registry.get(&attachment.generator)?;
        generator.create_payload(&attachment.content_object, "", &event.parent)
    }
}

/// The deduped union of all non-create previous anchors, preserving
/// first-seen order.
fn dedup_parents(payload: &AnchorPayload) -> Vec<String> {
    let mut parents = Vec::new();
    for suffix_anchor in &payload.previous_anchors {
        if let Some(previous) = &suffix_anchor.previous_anchor {
            if !parents.contains(previous) {
                parents.push(previous.clone());
            }
        }
    }
    parents
}
