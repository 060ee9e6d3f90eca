use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use branchtag_core::config::TaggerConfig;
use branchtag_core::error::TaggerError;
use branchtag_core::models::scan::{Organization, Project, Target};

use crate::paginate::{resolve_next_link, PageRequest, PaginatedFetcher};
use crate::resource::{extract_organizations, extract_projects, extract_targets};
use crate::transport::{ApiTransport, HttpTransport};
use crate::{ProjectUpdate, ScanPlatform};

/// REST client for the scan platform.
pub struct SnykClient {
    transport: Arc<dyn ApiTransport>,
    fetcher: PaginatedFetcher,
    api_version: String,
    page_limit: u32,
}

impl SnykClient {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        base_url: Url,
        api_version: impl Into<String>,
        page_limit: u32,
    ) -> Self {
        Self {
            fetcher: PaginatedFetcher::new(transport.clone(), base_url),
            transport,
            api_version: api_version.into(),
            page_limit,
        }
    }

    /// Build an HTTP-backed client for the configured region.
    pub fn from_config(config: &TaggerConfig, token: &str) -> Result<Self, TaggerError> {
        let base_url = Url::parse(config.region.base_url()).map_err(|e| TaggerError::InvalidUrl {
            url: config.region.base_url().to_string(),
            message: e.to_string(),
        })?;
        let transport = HttpTransport::new(token, Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(
            Arc::new(transport),
            base_url,
            config.api_version.clone(),
            config.page_limit,
        ))
    }

    fn url(&self, path: &str) -> Result<Url, TaggerError> {
        resolve_next_link(self.fetcher.base_url(), path)
    }

    fn versioned(&self, path: impl Into<String>) -> PageRequest {
        PageRequest::new(path).param("version", self.api_version.clone())
    }
}

#[async_trait]
impl ScanPlatform for SnykClient {
    async fn token_identity(&self) -> Result<Option<String>, TaggerError> {
        let url = self.url("/rest/self")?;
        let query = [("version".to_string(), self.api_version.clone())];
        let body = self.transport.get_json(&url, &query).await?;
        Ok(body
            .pointer("/data/id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from))
    }

    async fn list_organizations(
        &self,
        group_id: Option<&str>,
    ) -> Result<Vec<Organization>, TaggerError> {
        let mut request = self.versioned("/rest/orgs").limit(self.page_limit);
        if let Some(group) = group_id {
            request = request.param("group_id", group);
        }
        let orgs = self
            .fetcher
            .fetch_all("orgs", &request, extract_organizations)
            .await?;
        tracing::info!("found {} organization(s)", orgs.len());
        Ok(orgs)
    }

    async fn list_targets(
        &self,
        org_id: &str,
        source_types: &[String],
    ) -> Result<Vec<Target>, TaggerError> {
        let mut request = self
            .versioned(format!("/rest/orgs/{org_id}/targets"))
            .limit(self.page_limit);
        if !source_types.is_empty() {
            tracing::debug!("filtering targets by source types: {}", source_types.join(", "));
            request = request.param("source_types", source_types.join(","));
        }
        self.fetcher
            .fetch_all("targets", &request, extract_targets)
            .await
    }

    async fn list_projects(
        &self,
        org_id: &str,
        target_id: &str,
    ) -> Result<Vec<Project>, TaggerError> {
        let request = self
            .versioned(format!("/rest/orgs/{org_id}/projects"))
            .limit(self.page_limit)
            .param("target_id", target_id);
        self.fetcher
            .fetch_page("projects", &request, extract_projects)
            .await
    }

    async fn update_project(&self, org_id: &str, update: &ProjectUpdate) -> Result<(), TaggerError> {
        let url = self.url(&format!("/rest/orgs/{org_id}/projects/{}", update.project_id))?;
        let query = [("version".to_string(), self.api_version.clone())];
        self.transport
            .patch_json(&url, &query, &update.to_body())
            .await?;
        Ok(())
    }
}
