use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON-LD context of every anchor event.
pub const ANCHOR_EVENT_CONTEXT: &str = "https://w3id.org/activityanchors/v1";

/// `type` value of the event envelope.
pub const ANCHOR_EVENT_TYPE: &str = "AnchorEvent";

/// `type` value of the anchor-object attachment.
pub const ANCHOR_OBJECT_TYPE: &str = "AnchorObject";

/// One affected DID within a linkset link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous: Vec<String>,
}

/// A single link of the linkset: the anchor's own locator, the generator
/// profile that produced it and the items it covers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub anchor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub profile: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<Item>,
}

/// On-wire linkset document. Exactly one link is produced per anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Linkset {
    pub linkset: Vec<Link>,
}

impl Linkset {
    pub fn new(link: Link) -> Self {
        Self {
            linkset: vec![link],
        }
    }

    /// The single link of a well-formed anchor linkset.
    pub fn link(&self) -> Option<&Link> {
        self.linkset.first()
    }
}

/// A loosely-typed verifiable credential. The signature suites are out of
/// scope, so proofs are opaque JSON objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    pub issuer: String,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proof: Vec<serde_json::Value>,
}

/// Attachment of an anchor event: the anchor object itself plus, once
/// collected, the witnessed credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub attachment_type: String,
    pub url: String,
    pub generator: String,
    #[serde(rename = "contentObject")]
    pub content_object: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<VerifiableCredential>,
}

/// The replication envelope surrounding an anchor linkset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorEvent {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub index: String,
    pub attachment: Vec<Attachment>,
    #[serde(rename = "attributedTo")]
    pub attributed_to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent: Vec<String>,
    pub published: DateTime<Utc>,
    pub url: String,
}

impl AnchorEvent {
    /// The anchor-object attachment, if present.
    pub fn anchor_object(&self) -> Option<&Attachment> {
        self.attachment
            .iter()
            .find(|a| a.attachment_type == ANCHOR_OBJECT_TYPE)
    }
}
