use std::sync::{Arc, Mutex};

use branchtag_core::models::repo::{RepositoryIdentity, RepositoryInfo};

use crate::identity::extract_identity;
use crate::{HostFailure, RepoHost};

/// Why a target URL could not be resolved to a default branch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The URL does not yield an owner/repo pair.
    #[error("could not derive owner/repo from {url}")]
    Identity { url: String },
    /// The hosting platform lookup failed.
    #[error("repository lookup failed: {0}")]
    Metadata(HostFailure),
}

/// Target URL -> repository identity -> default branch.
pub struct BranchResolver {
    host: Arc<dyn RepoHost>,
    host_marker: String,
    last_failure: Mutex<Option<HostFailure>>,
}

impl BranchResolver {
    pub fn new(host: Arc<dyn RepoHost>, host_marker: impl Into<String>) -> Self {
        Self {
            host,
            host_marker: host_marker.into(),
            last_failure: Mutex::new(None),
        }
    }

    pub fn identity(&self, url: &str) -> Result<RepositoryIdentity, ResolveError> {
        extract_identity(url, &self.host_marker).map_err(|_| ResolveError::Identity {
            url: url.to_string(),
        })
    }

    /// Resolve the repository behind `url`.
    ///
    /// Metadata failures are returned and also kept as the most recent failure.
    pub async fn resolve(&self, url: &str) -> Result<RepositoryInfo, ResolveError> {
        let identity = self.identity(url)?;
        match self.host.default_branch(&identity).await {
            Ok(default_branch) => Ok(RepositoryInfo {
                owner: identity.owner,
                repo: identity.repo,
                default_branch,
                source_url: url.to_string(),
            }),
            Err(failure) => {
                tracing::warn!("hosting-platform error: {failure}");
                *self.last_failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(failure.clone());
                Err(ResolveError::Metadata(failure))
            }
        }
    }

    /// Diagnostics of the most recent metadata failure, if any.
    pub fn last_failure(&self) -> Option<HostFailure> {
        self.last_failure
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticHost(HashMap<String, Result<String, u16>>);

    #[async_trait]
    impl RepoHost for StaticHost {
        async fn default_branch(&self, identity: &RepositoryIdentity) -> Result<String, HostFailure> {
            match self.0.get(&identity.to_string()) {
                Some(Ok(branch)) => Ok(branch.clone()),
                Some(Err(status)) => {
                    let mut failure = HostFailure::new("fake", identity);
                    failure.status_code = Some(*status);
                    Err(failure)
                }
                None => Err(HostFailure::new("fake", identity)),
            }
        }
    }

    fn resolver() -> BranchResolver {
        let mut repos = HashMap::new();
        repos.insert("acme/widgets".to_string(), Ok("main".to_string()));
        repos.insert("acme/private".to_string(), Err(404));
        BranchResolver::new(Arc::new(StaticHost(repos)), "github.com")
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let info = resolver()
            .resolve("https://github.com/acme/widgets.git")
            .await
            .unwrap();
        assert_eq!(info.default_branch, "main");
        assert_eq!(info.repo, "widgets");
        assert_eq!(info.source_url, "https://github.com/acme/widgets.git");
    }

    #[tokio::test]
    async fn test_resolve_identity_failure() {
        let r = resolver();
        let err = r.resolve("https://github.com/acme").await.unwrap_err();
        assert!(matches!(err, ResolveError::Identity { .. }));
        assert_eq!(
            err.to_string(),
            "could not derive owner/repo from https://github.com/acme"
        );
        assert!(r.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_resolve_keeps_last_failure() {
        let r = resolver();
        let err = r.resolve("https://github.com/acme/private").await.unwrap_err();
        match err {
            ResolveError::Metadata(f) => assert_eq!(f.status_code, Some(404)),
            other => panic!("unexpected: {other}"),
        }
        assert_eq!(r.last_failure().unwrap().repo, "private");
    }
}
