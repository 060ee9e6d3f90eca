use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scan-platform tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

/// A tracked repository under an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: Option<String>,
    /// Raw attributes as returned, kept for ledger context.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A key/value annotation attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The ownership relationship recorded on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum OwnerRef {
    Present(String),
    Absent,
    /// The relationship exists but carries no usable id.
    Malformed(String),
}

impl OwnerRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            OwnerRef::Present(id) => Some(id),
            _ => None,
        }
    }
}

/// A scan configuration bound to one branch of a target's repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Branch or ref the scan runs against.
    pub target_reference: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Tag entries that did not decode as key/value pairs, kept verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreadable_tags: Vec<Value>,
    pub owner: OwnerRef,
    /// Relationship names present on the resource.
    #[serde(default)]
    pub relationship_keys: Vec<String>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target_reference: None,
            tags: Vec::new(),
            unreadable_tags: Vec::new(),
            owner: OwnerRef::Absent,
            relationship_keys: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.target_reference = Some(reference.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = OwnerRef::Present(owner.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }
}
