use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use branchtag_core::error::TaggerError;

/// Query parameters attached to a request.
pub type Query = [(String, String)];

/// JSON request/response exchange with the scan platform.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET `url` with `query`, returning the decoded body of a 2xx response.
    async fn get_json(&self, url: &Url, query: &Query) -> Result<Value, TaggerError>;

    /// PATCH `url` with a JSON body, returning the decoded body (or null) of a 2xx response.
    async fn patch_json(&self, url: &Url, query: &Query, body: &Value) -> Result<Value, TaggerError>;
}

/// reqwest-backed transport carrying the scan-platform token.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, TaggerError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/vnd.api+json"),
        );
        let auth = HeaderValue::from_str(&format!("token {token}")).map_err(|e| {
            TaggerError::Config {
                message: format!("scan-platform token is not a valid header value: {e}"),
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

        Ok(Self { client })
    }

    async fn decode(url: &Url, resp: reqwest::Response) -> Result<Value, TaggerError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| TaggerError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        decode_body(url, status, &body)
    }
}

/// Map a response status and raw body onto the decoded JSON value.
///
/// Non-2xx is an `ApiError` carrying the body; an empty 2xx body is `Null`.
pub(crate) fn decode_body(url: &Url, status: StatusCode, body: &str) -> Result<Value, TaggerError> {
    if !status.is_success() {
        return Err(TaggerError::ApiError {
            status: status.as_u16(),
            url: url.to_string(),
            message: body.to_string(),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| TaggerError::MalformedResponse {
        url: url.to_string(),
        message: format!("JSON parse error: {e}"),
    })
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, url: &Url, query: &Query) -> Result<Value, TaggerError> {
        tracing::debug!("GET {url}");
        let resp = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| TaggerError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Self::decode(url, resp).await
    }

    async fn patch_json(&self, url: &Url, query: &Query, body: &Value) -> Result<Value, TaggerError> {
        tracing::debug!("PATCH {url}");
        let payload = serde_json::to_vec(body).map_err(|e| TaggerError::Serialization(e.to_string()))?;
        let resp = self
            .client
            .patch(url.clone())
            .query(query)
            .body(payload)
            .send()
            .await
            .map_err(|e| TaggerError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Self::decode(url, resp).await
    }
}
