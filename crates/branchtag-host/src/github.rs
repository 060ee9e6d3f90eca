use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use branchtag_core::error::TaggerError;
use branchtag_core::models::repo::RepositoryIdentity;

use crate::{HostFailure, RepoHost};

pub struct GitHubClient {
    client: reqwest::Client,
    api_url: Url,
}

impl GitHubClient {
    pub fn new(api_url: Url, token: &str, timeout: Duration) -> Result<Self, TaggerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        let auth = HeaderValue::from_str(&format!("token {token}")).map_err(|e| {
            TaggerError::Config {
                message: format!("hosting-platform token is not a valid header value: {e}"),
            }
        })?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("branchtag/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TaggerError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, api_url })
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }
}

#[derive(Deserialize)]
struct GhRepo {
    default_branch: Option<String>,
}

/// Turn a repository-metadata response into a default branch or a failure.
pub fn interpret_response(
    url: &str,
    identity: &RepositoryIdentity,
    status: u16,
    headers: BTreeMap<String, String>,
    body: &str,
) -> Result<String, HostFailure> {
    let mut failure = HostFailure::new(url, identity);

    if status != 200 {
        failure.status_code = Some(status);
        failure.response_text = Some(body.to_string());
        failure.headers = Some(headers);
        return Err(failure);
    }

    match serde_json::from_str::<GhRepo>(body) {
        Ok(GhRepo {
            default_branch: Some(branch),
        }) if !branch.is_empty() => Ok(branch),
        Ok(_) => {
            failure.status_code = Some(status);
            failure.exception = Some("MissingDefaultBranch".into());
            failure.message = Some("response has no default_branch".into());
            Err(failure)
        }
        Err(e) => {
            failure.status_code = Some(status);
            failure.exception = Some("MalformedResponse".into());
            failure.message = Some(format!("JSON parse error: {e}"));
            failure.response_text = Some(body.to_string());
            Err(failure)
        }
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn transport_failure(url: &str, identity: &RepositoryIdentity, e: &reqwest::Error) -> HostFailure {
    let mut failure = HostFailure::new(url, identity);
    let kind = if e.is_timeout() {
        "Timeout"
    } else if e.is_connect() {
        "ConnectionError"
    } else {
        "RequestError"
    };
    failure.exception = Some(kind.into());
    failure.message = Some(e.to_string());
    failure.status_code = e.status().map(|s| s.as_u16());
    failure
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn default_branch(&self, identity: &RepositoryIdentity) -> Result<String, HostFailure> {
        let url = self.url(&format!("/repos/{}/{}", identity.owner, identity.repo));
        tracing::debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_failure(&url, identity, &e))?;

        let status = resp.status().as_u16();
        let headers = header_map(resp.headers());
        let body = resp
            .text()
            .await
            .map_err(|e| transport_failure(&url, identity, &e))?;

        interpret_response(&url, identity, status, headers, &body)
    }
}
