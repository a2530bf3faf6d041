//! HTTP client for the hosted recipe backend.
//!
//! Rows are served by a PostgREST-style interface under `/rest/v1`, image
//! blobs by an object store under `/storage/v1`. This module owns request
//! plumbing only: authentication headers, timeouts, status mapping, bounded
//! body reads and exact-count parsing. Table-specific queries live in
//! [`crate::recipes`].
//!
//! # Example
//!
//! ```ignore
//! let backend = Backend::new("https://project.example.co", api_key)?;
//! let total = backend.select("recipes", "*").count().await?;
//! ```

mod query;
mod storage;

pub use query::{Mutation, Select};

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::session::SessionContext;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors raised by any backend round trip.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the client-side timeout
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response; `message` is the (truncated) response body
    #[error("HTTP error: status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response body did not match the expected record shape
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Exact count was requested but `Content-Range` was missing or unparsable
    #[error("Missing or malformed Content-Range header")]
    MissingCount,
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl BackendError {
    /// True when a single-row request matched no rows (PostgREST answers 406).
    pub fn is_no_rows(&self) -> bool {
        matches!(self, BackendError::HttpStatus { status: 406, .. })
    }
}

/// Handle to the remote backend. Cheap to clone.
#[derive(Clone)]
pub struct Backend {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    access_token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("signed_in", &self.access_token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Backend {
    /// Create a backend handle for `base_url`.
    ///
    /// HTTPS is required, except for plain HTTP to a loopback host.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, BackendError> {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Same as [`Backend::new`] with a caller-configured HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
    ) -> Result<Self, BackendError> {
        // Url::join replaces the last segment unless the path ends with '/'
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)?;

        if base_url.scheme() != "https" {
            let is_loopback = base_url.scheme() == "http"
                && matches!(
                    base_url.host_str(),
                    Some("localhost" | "127.0.0.1" | "[::1]")
                );
            if !is_loopback {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS backend URL");
                return Err(BackendError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base_url, "Using non-HTTPS backend URL (loopback only)");
        }

        Ok(Self {
            client,
            base_url,
            api_key,
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Forward the session's bearer token instead of the anon key.
    pub fn with_session(mut self, session: &SessionContext) -> Self {
        self.access_token = session.access_token.clone();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn rest_url(&self, table: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join("rest/v1/")?.join(table)?)
    }

    pub(crate) fn storage_url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join("storage/v1/")?.join(path)?)
    }

    /// Start a request carrying the `apikey` and `Authorization` headers.
    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let bearer = self
            .access_token
            .as_ref()
            .unwrap_or(&self.api_key)
            .expose_secret()
            .to_string();
        self.client
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Send a request, enforcing the timeout and mapping non-2xx statuses.
    pub(crate) async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| BackendError::Timeout)?
            .map_err(BackendError::Network)?;

        let status = response.status();
        if !status.is_success() {
            // Best effort: the body usually carries the PostgREST error JSON
            let message = match read_limited_bytes(response, 4096).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => String::new(),
            };
            tracing::debug!(status = status.as_u16(), message = %message, "Backend returned error status");
            return Err(BackendError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Read and decode a JSON body.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Total row count from a `Content-Range` header (`0-2/7`, `*/7`).
///
/// Returns `None` for an unknown total (`*/*`) or a malformed value.
pub(crate) fn content_range_total(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let value = headers.get(reqwest::header::CONTENT_RANGE)?.to_str().ok()?;
    parse_content_range_total(value)
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BackendError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(BackendError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BackendError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BackendError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("anon-key")
    }

    #[test]
    fn test_rejects_plain_http_remote() {
        let result = Backend::new("http://example.com", key());
        assert!(matches!(result, Err(BackendError::InsecureBaseUrl)));
    }

    #[test]
    fn test_accepts_localhost_http() {
        assert!(Backend::new("http://127.0.0.1:5432", key()).is_ok());
        assert!(Backend::new("http://localhost:5432", key()).is_ok());
    }

    #[test]
    fn test_rejects_plain_http_lookalike_hosts() {
        for url in [
            "http://localhost.attacker.example",
            "http://127.0.0.1.nip.io",
            "http://localhostx:8000",
            "http://user@evil.example/localhost",
            "ftp://localhost",
        ] {
            let result = Backend::new(url, key());
            assert!(
                matches!(result, Err(BackendError::InsecureBaseUrl)),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_accepts_loopback_http_with_path() {
        assert!(Backend::new("http://localhost", key()).is_ok());
        assert!(Backend::new("http://[::1]:54321/", key()).is_ok());
        assert!(Backend::new("http://127.0.0.1:54321/api", key()).is_ok());
    }

    #[test]
    fn test_rest_url_keeps_base_path() {
        let backend = Backend::new("https://example.com/proxy", key()).unwrap();
        let url = backend.rest_url("recipes").unwrap();
        assert_eq!(url.as_str(), "https://example.com/proxy/rest/v1/recipes");
    }

    #[test]
    fn test_storage_url() {
        let backend = Backend::new("https://example.com/", key()).unwrap();
        let url = backend.storage_url("object/recipe-images").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/storage/v1/object/recipe-images"
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range_total("0-2/7"), Some(7));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("*/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_no_rows_detection() {
        let err = BackendError::HttpStatus {
            status: 406,
            message: "PGRST116".into(),
        };
        assert!(err.is_no_rows());
        assert!(!BackendError::Timeout.is_no_rows());
    }

    #[test]
    fn test_debug_masks_key() {
        let backend = Backend::new("https://example.com", SecretString::from("s3cr3t")).unwrap();
        let output = format!("{:?}", backend);
        assert!(!output.contains("s3cr3t"));
    }
}
