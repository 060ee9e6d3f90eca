use serde::Serialize;

use branchtag_core::models::scan::{OwnerRef, Project};
use branchtag_scan::ScanPlatform;

/// Where a resolved owner came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSource {
    Recorded,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub id: String,
    pub source: OwnerSource,
}

/// Neither the project nor the fallback identity supplies an owner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct OwnerUnresolved {
    pub reason: String,
    pub available_keys: Vec<String>,
}

/// Resolves the owner written with every project update.
#[derive(Debug, Clone, Default)]
pub struct OwnerResolver {
    fallback: Option<String>,
}

impl OwnerResolver {
    /// `fallback` is the token holder's own id, fetched once at startup.
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            fallback: fallback.filter(|id| !id.is_empty()),
        }
    }

    /// Fetch the token holder's id once; a failed lookup means no fallback.
    pub async fn from_platform(scan: &dyn ScanPlatform) -> Self {
        match scan.token_identity().await {
            Ok(Some(id)) => {
                tracing::info!("token user id: {id}");
                Self::new(Some(id))
            }
            Ok(None) => {
                tracing::warn!("token details carry no user id; projects without an owner will be skipped");
                Self::new(None)
            }
            Err(e) => {
                tracing::warn!("could not fetch token details ({e}); projects without an owner will be skipped");
                Self::new(None)
            }
        }
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn resolve(&self, project: &Project) -> Result<ResolvedOwner, OwnerUnresolved> {
        let reason = match &project.owner {
            OwnerRef::Present(id) => {
                return Ok(ResolvedOwner {
                    id: id.clone(),
                    source: OwnerSource::Recorded,
                })
            }
            OwnerRef::Absent => "project has no recorded owner".to_string(),
            OwnerRef::Malformed(detail) => format!("project owner is malformed: {detail}"),
        };

        match &self.fallback {
            Some(id) => {
                tracing::info!("using fallback user id {id} for project {}", project.id);
                Ok(ResolvedOwner {
                    id: id.clone(),
                    source: OwnerSource::Fallback,
                })
            }
            None => Err(OwnerUnresolved {
                reason: format!("{reason} and no fallback identity is available"),
                available_keys: project.relationship_keys.clone(),
            }),
        }
    }
}
