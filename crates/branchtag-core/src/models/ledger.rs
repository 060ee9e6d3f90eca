use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coarse classification of a per-entity failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingTargetUrl,
    RepoIdentityError,
    GithubApiError,
    MissingProjectDetails,
    InvalidProjectTags,
    MissingOwnerId,
    TaggingApiError,
    TargetWorkerFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingTargetUrl => write!(f, "missing_target_url"),
            ErrorKind::RepoIdentityError => write!(f, "repo_identity_error"),
            ErrorKind::GithubApiError => write!(f, "github_api_error"),
            ErrorKind::MissingProjectDetails => write!(f, "missing_project_details"),
            ErrorKind::InvalidProjectTags => write!(f, "invalid_project_tags"),
            ErrorKind::MissingOwnerId => write!(f, "missing_owner_id"),
            ErrorKind::TaggingApiError => write!(f, "tagging_api_error"),
            ErrorKind::TargetWorkerFailed => write!(f, "target_worker_failed"),
        }
    }
}

/// Where in the inventory a failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl RecordContext {
    pub fn org(id: &str, name: &str) -> Self {
        Self {
            org_id: Some(id.to_string()),
            org_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, id: &str, url: Option<&str>) -> Self {
        self.target_id = Some(id.to_string());
        self.target_url = url.map(str::to_string);
        self
    }

    pub fn with_project(mut self, id: &str, name: &str) -> Self {
        self.project_id = Some(id.to_string());
        self.project_name = Some(name.to_string());
        self
    }
}

/// One entity that could not be fully processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub details: Map<String, Value>,
    pub context: Option<RecordContext>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, details: Map<String, Value>, context: Option<RecordContext>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            details,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_like_display() {
        let kinds = [
            ErrorKind::MissingTargetUrl,
            ErrorKind::RepoIdentityError,
            ErrorKind::GithubApiError,
            ErrorKind::MissingProjectDetails,
            ErrorKind::InvalidProjectTags,
            ErrorKind::MissingOwnerId,
            ErrorKind::TaggingApiError,
            ErrorKind::TargetWorkerFailed,
        ];
        for kind in kinds {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, Value::String(kind.to_string()));
        }
    }

    #[test]
    fn test_context_skips_empty_fields() {
        let ctx = RecordContext::org("o1", "Acme").with_target("t1", None);
        let json = serde_json::to_value(&ctx).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(!obj.contains_key("target_url"));
    }
}
