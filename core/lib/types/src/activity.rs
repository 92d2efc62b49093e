use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `type` of an activity soliciting a witness proof.
pub const OFFER_TYPE: &str = "Offer";

/// `type` of an activity accepting an offer with a proof attached.
pub const ACCEPT_TYPE: &str = "Accept";

/// `type` of an activity announcing a published anchor.
pub const CREATE_TYPE: &str = "Create";

/// A federated activity as read and written by the core: only the fields
/// the core interprets are typed, the object is carried verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    pub object: serde_json::Value,
    pub published: DateTime<Utc>,
}
