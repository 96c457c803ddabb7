//! Request forwarding to the backend server.
//!
//! Two named variants with distinct failure semantics:
//! - [`ProxyClient::forward_raw`] relays the backend response verbatim,
//!   whatever its status.
//! - [`ProxyClient::forward_json`] parses the JSON body and maps a reachable
//!   backend's non-success status to [`Error::Backend`], so the gateway
//!   surfaces the backend's own status code instead of a generic 502.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use reqwest::Client;

use crate::error::{Error, Result};

/// Backend response relayed verbatim: status, content type and body bytes.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Client for forwarding requests to the local backend.
pub struct ProxyClient {
    http_client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Forward a request and return the backend response verbatim.
    ///
    /// Any backend status passes through unchanged; only network-level
    /// failures become gateway errors.
    pub async fn forward_raw(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("Forwarding {} {}", method, url);

        let mut request = self.http_client.request(method, &url);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(unreachable_error)?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(unreachable_error)?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Forward a request and parse the backend's JSON body.
    ///
    /// A reachable backend returning a non-success status maps to
    /// [`Error::Backend`] carrying that status.
    pub async fn forward_json(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("Forwarding {} {} (structured)", method, url);

        let response = self
            .http_client
            .request(method, &url)
            .send()
            .await
            .map_err(unreachable_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(status));
        }

        response
            .json()
            .await
            .map_err(|e| Error::BackendUnreachable(format!("invalid backend body: {}", e)))
    }
}

fn unreachable_error(e: reqwest::Error) -> Error {
    // The error text is safe to surface: it names the loopback URL, never a secret.
    Error::BackendUnreachable(e.to_string())
}
