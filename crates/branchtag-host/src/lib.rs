pub mod github;
pub mod identity;
pub mod resolver;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use branchtag_core::models::repo::RepositoryIdentity;

pub use github::GitHubClient;
pub use resolver::{BranchResolver, ResolveError};

/// Diagnostics captured when a repository-metadata lookup fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostFailure {
    pub url: String,
    pub owner: String,
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HostFailure {
    pub fn new(url: &str, identity: &RepositoryIdentity) -> Self {
        Self {
            url: url.to_string(),
            owner: identity.owner.clone(),
            repo: identity.repo.clone(),
            ..Self::default()
        }
    }

    /// Flatten into a ledger details mapping.
    pub fn to_details(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl std::fmt::Display for HostFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = self
            .message
            .as_deref()
            .or(self.response_text.as_deref())
            .or(self.exception.as_deref())
            .unwrap_or("unknown error");
        let msg: String = msg.chars().take(500).collect();
        match self.status_code {
            Some(status) => write!(f, "status {status} for {}: {msg}", self.url),
            None => write!(f, "{}: {msg}", self.url),
        }
    }
}

/// Repository metadata source on the hosting platform.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Authoritative default branch of `identity`.
    async fn default_branch(&self, identity: &RepositoryIdentity) -> Result<String, HostFailure>;
}
