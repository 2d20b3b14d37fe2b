//! Platform data model: agents, assets, tags, and tag categories as returned
//! by the vendor inventory API. All records are ephemeral per run; snapshots
//! are a same-run cache, not a source of truth.

use serde::{Deserialize, Serialize};

/// A scanner agent enrolled in the platform, optionally a member of named groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub uuid: String,
    pub name: String,
    /// Absent in the wire format when the agent belongs to no group.
    #[serde(default)]
    pub groups: Vec<AgentGroup>,
}

/// A named agent group. Only the name participates in reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentGroup {
    pub name: String,
}

/// A scanned host record in the platform inventory.
///
/// The wire format carries hostnames as a list; reconciliation keys on the
/// first entry. An empty list means the asset cannot be matched to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub hostname: Vec<String>,
}

impl Asset {
    /// Primary hostname used as the agent-matching key, if any.
    pub fn primary_hostname(&self) -> Option<&str> {
        self.hostname.first().map(String::as_str).filter(|h| !h.is_empty())
    }
}

/// A tag currently attached to an asset, as returned by the asset-tags endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetTag {
    pub category_name: String,
    pub value: String,
}

/// A tag definition. Addressed by (category, value) for humans and by `uuid`
/// for the assignment mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub uuid: String,
    pub category_name: String,
    pub value: String,
}

/// A tag category (namespace for tag values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagCategory {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Direction of a bulk tag-assignment mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    Add,
    Remove,
}

impl std::fmt::Display for TagAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagAction::Add => write!(f, "add"),
            TagAction::Remove => write!(f, "remove"),
        }
    }
}
