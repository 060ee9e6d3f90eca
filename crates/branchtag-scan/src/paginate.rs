use std::sync::Arc;

use serde_json::Value;
use url::Url;

use branchtag_core::error::TaggerError;

use crate::transport::ApiTransport;

/// First request of a collection listing.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Path below the service base URL, e.g. `/rest/orgs`.
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Page-size ceiling.
    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", limit.to_string())
    }
}

/// Resolve a `links.next` value against the service base URL.
///
/// Absolute URLs are used verbatim, root-relative paths are appended to the
/// base, and bare fragments are appended after a separator.
pub fn resolve_next_link(base: &Url, next: &str) -> Result<Url, TaggerError> {
    let invalid = |e: url::ParseError| TaggerError::InvalidUrl {
        url: next.to_string(),
        message: e.to_string(),
    };

    if next.starts_with("http://") || next.starts_with("https://") {
        return Url::parse(next).map_err(invalid);
    }

    let root = base.as_str().trim_end_matches('/');
    let joined = if next.starts_with('/') {
        format!("{root}{next}")
    } else {
        format!("{root}/{}", next.trim_start_matches('/'))
    };
    Url::parse(&joined).map_err(invalid)
}

/// Next-link of a response envelope, if any.
pub fn next_link(page: &Value) -> Option<&str> {
    page.get("links")
        .and_then(|links| links.get("next"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Cursor-following fetch loop over a collection endpoint.
pub struct PaginatedFetcher {
    transport: Arc<dyn ApiTransport>,
    base_url: Url,
}

impl PaginatedFetcher {
    pub fn new(transport: Arc<dyn ApiTransport>, base_url: Url) -> Self {
        Self {
            transport,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch every page and concatenate the extracted records in server order.
    ///
    /// Query parameters go on the first request only; next-links carry their
    /// own cursor. Any failed page fails the whole listing.
    pub async fn fetch_all<T, F>(
        &self,
        label: &str,
        request: &PageRequest,
        extract: F,
    ) -> Result<Vec<T>, TaggerError>
    where
        F: Fn(&Value) -> Result<Vec<T>, TaggerError>,
    {
        let mut all = Vec::new();
        let mut url = resolve_next_link(&self.base_url, &request.path)?;
        let mut query = request.query.clone();
        let mut seen = vec![url.clone()];
        let mut page = 1u32;

        loop {
            tracing::debug!("fetching {label} page {page}");
            let body = self.transport.get_json(&url, &query).await?;
            all.extend(extract(&body)?);

            let Some(next) = next_link(&body) else {
                break;
            };
            let next_url = resolve_next_link(&self.base_url, next)?;
            if seen.contains(&next_url) {
                return Err(TaggerError::MalformedResponse {
                    url: next_url.to_string(),
                    message: format!("{label} pagination revisits an earlier page"),
                });
            }
            seen.push(next_url.clone());
            url = next_url;
            query.clear();
            page += 1;
        }

        tracing::debug!("fetched {} {label} across {page} page(s)", all.len());
        Ok(all)
    }

    /// Fetch a single page, ignoring any next-link.
    pub async fn fetch_page<T, F>(
        &self,
        label: &str,
        request: &PageRequest,
        extract: F,
    ) -> Result<Vec<T>, TaggerError>
    where
        F: Fn(&Value) -> Result<Vec<T>, TaggerError>,
    {
        let url = resolve_next_link(&self.base_url, &request.path)?;
        let body = self.transport.get_json(&url, &request.query).await?;
        if next_link(&body).is_some() {
            tracing::warn!("{label} listing has further pages; only the first is used");
        }
        extract(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://api.snyk.io").unwrap()
    }

    fn ids(body: &Value) -> Result<Vec<String>, TaggerError> {
        Ok(body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    #[test]
    fn test_resolve_next_link_shapes() {
        let b = base();
        assert_eq!(
            resolve_next_link(&b, "https://api.eu.snyk.io/rest/orgs?starting_after=x")
                .unwrap()
                .as_str(),
            "https://api.eu.snyk.io/rest/orgs?starting_after=x"
        );
        assert_eq!(
            resolve_next_link(&b, "/rest/orgs?starting_after=x").unwrap().as_str(),
            "https://api.snyk.io/rest/orgs?starting_after=x"
        );
        assert_eq!(
            resolve_next_link(&b, "rest/orgs?starting_after=x").unwrap().as_str(),
            "https://api.snyk.io/rest/orgs?starting_after=x"
        );
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "https://api.snyk.io/rest/orgs",
            json!({"data": [{"id": "a"}, {"id": "b"}], "links": {"next": "/rest/orgs?starting_after=b"}}),
        );
        transport.respond(
            "https://api.snyk.io/rest/orgs?starting_after=b",
            json!({"data": [{"id": "c"}, {"id": "d"}], "links": {"next": "https://api.snyk.io/rest/orgs?starting_after=d"}}),
        );
        transport.respond(
            "https://api.snyk.io/rest/orgs?starting_after=d",
            json!({"data": [{"id": "e"}], "links": {}}),
        );

        let fetcher = PaginatedFetcher::new(transport.clone(), base());
        let request = PageRequest::new("/rest/orgs").param("version", "2024-10-15").limit(2);
        let all = fetcher.fetch_all("orgs", &request, ids).await.unwrap();

        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].query.len(), 2);
        assert!(calls[1].query.is_empty());
        assert!(calls[2].query.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_stops_without_next_link() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "https://api.snyk.io/rest/orgs",
            json!({"data": [{"id": "a"}, {"id": "b"}], "links": {"next": null}}),
        );

        let fetcher = PaginatedFetcher::new(transport.clone(), base());
        let all = fetcher
            .fetch_all("orgs", &PageRequest::new("/rest/orgs"), ids)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_fails_whole_listing() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "https://api.snyk.io/rest/orgs",
            json!({"data": [{"id": "a"}], "links": {"next": "/rest/orgs?page=2"}}),
        );
        transport.fail("https://api.snyk.io/rest/orgs?page=2", 500);

        let fetcher = PaginatedFetcher::new(transport, base());
        let err = fetcher
            .fetch_all("orgs", &PageRequest::new("/rest/orgs"), ids)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_repeated_next_link_is_rejected() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "https://api.snyk.io/rest/orgs",
            json!({"data": [], "links": {"next": "/rest/orgs"}}),
        );

        let fetcher = PaginatedFetcher::new(transport, base());
        let err = fetcher
            .fetch_all("orgs", &PageRequest::new("/rest/orgs"), ids)
            .await
            .unwrap_err();
        assert!(matches!(err, TaggerError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_ignores_next_link() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "https://api.snyk.io/rest/orgs/o1/projects",
            json!({"data": [{"id": "p1"}], "links": {"next": "/rest/orgs/o1/projects?page=2"}}),
        );

        let fetcher = PaginatedFetcher::new(transport.clone(), base());
        let page = fetcher
            .fetch_page("projects", &PageRequest::new("/rest/orgs/o1/projects"), ids)
            .await
            .unwrap();
        assert_eq!(page, vec!["p1"]);
        assert_eq!(transport.calls().len(), 1);
    }
}
