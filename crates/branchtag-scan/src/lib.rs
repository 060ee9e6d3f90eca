pub mod paginate;
pub mod resource;
pub mod snyk;
pub mod transport;

use async_trait::async_trait;
use serde_json::{json, Value};

use branchtag_core::error::TaggerError;
use branchtag_core::models::scan::{Organization, Project, Tag, Target};

pub use snyk::SnykClient;

/// Partial update of a project: tags and owner only.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectUpdate {
    pub project_id: String,
    pub tags: Vec<Tag>,
    pub owner_id: String,
}

impl ProjectUpdate {
    /// JSON:API PATCH document carrying only the changed fields.
    pub fn to_body(&self) -> Value {
        json!({
            "data": {
                "type": "project",
                "id": self.project_id,
                "attributes": {
                    "tags": self.tags,
                },
                "relationships": {
                    "owner": {
                        "data": {
                            "id": self.owner_id,
                            "type": "user",
                        }
                    }
                }
            }
        })
    }
}

/// Operations the tagger needs from the scan platform.
#[async_trait]
pub trait ScanPlatform: Send + Sync {
    /// Id of the user the token belongs to, if the platform reports one.
    async fn token_identity(&self) -> Result<Option<String>, TaggerError>;

    /// All organizations, optionally scoped to a group (handles pagination).
    async fn list_organizations(&self, group_id: Option<&str>)
        -> Result<Vec<Organization>, TaggerError>;

    /// All targets of an organization, optionally filtered by source type (handles pagination).
    async fn list_targets(
        &self,
        org_id: &str,
        source_types: &[String],
    ) -> Result<Vec<Target>, TaggerError>;

    /// Projects bound to a target (single page).
    async fn list_projects(&self, org_id: &str, target_id: &str)
        -> Result<Vec<Project>, TaggerError>;

    /// Write tags and owner onto a project.
    async fn update_project(&self, org_id: &str, update: &ProjectUpdate) -> Result<(), TaggerError>;
}
