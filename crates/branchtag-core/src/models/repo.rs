use serde::{Deserialize, Serialize};

/// `{owner, repo}` join key between the two platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub repo: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Resolved facts about a hosting-platform repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    pub source_url: String,
}

impl RepositoryInfo {
    pub fn identity(&self) -> RepositoryIdentity {
        RepositoryIdentity::new(self.owner.clone(), self.repo.clone())
    }
}
