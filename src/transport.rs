//! Download transport used by providers and the retrieval session.
//!
//! The [`DownloadTransport`] trait keeps sessions independent of the HTTP
//! stack: production code uses [`HttpTransport`] (reqwest), tests substitute
//! [`mocks::MockTransport`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::NetworkConfig;

/// Transport failures. Always recoverable at the candidate level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Not found")]
    NotFound,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    Parse(String),
}

/// One download, keyed by host, port and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
    /// Jump ahead of normal requests
    pub priority: bool,
    /// Must not be dropped under load
    pub important: bool,
}

impl DownloadRequest {
    /// Split a URL into a request. Image downloads are high priority and
    /// not important by default.
    pub fn from_url(url: &Url) -> Result<Self, TransportError> {
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            priority: true,
            important: false,
        })
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    /// Reassemble the full URL.
    pub fn url(&self) -> String {
        let mut url = format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path);
        if let Some(query) = &self.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Shared, thread-safe download transport.
#[async_trait]
pub trait DownloadTransport: Send + Sync {
    /// Fetch raw bytes.
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<u8>, TransportError>;

    /// Fetch and parse a JSON document.
    async fn get_json(&self, request: &DownloadRequest) -> Result<serde_json::Value, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http_client })
    }

    async fn send(
        &self,
        request: &DownloadRequest,
        accept: &str,
    ) -> Result<reqwest::Response, TransportError> {
        let url = request.url();
        tracing::debug!(target: "coverart", url = %url, priority = request.priority, "Downloading");

        let response = self
            .http_client
            .get(&url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound);
        }

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl DownloadTransport for HttpTransport {
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<u8>, TransportError> {
        let response = self.send(request, "*/*").await?;
        let data = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(data.to_vec())
    }

    async fn get_json(&self, request: &DownloadRequest) -> Result<serde_json::Value, TransportError> {
        let response = self.send(request, "application/json").await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))
    }
}
