//! MusicBrainz HTTP client
//!
//! Looks up releases with their URL relationships and release group, which is
//! everything the cover art providers need.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to 1 req/sec.

use std::time::Duration;

use super::dto;
use crate::config::NetworkConfig;

/// Release lookup failures
#[derive(Debug, thiserror::Error)]
pub enum MusicBrainzError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Release not found")]
    NotFound,

    #[error("Rate limited by MusicBrainz")]
    RateLimited,

    #[error("MusicBrainz error: {0}")]
    ApiError(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicBrainzClient {
    /// Create a client for the public web service
    pub fn new(config: &NetworkConfig) -> Result<Self, MusicBrainzError> {
        Self::with_base_url(config, "https://musicbrainz.org/ws/2")
    }

    /// Create a client for a mirror or a test server
    pub fn with_base_url(
        config: &NetworkConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, MusicBrainzError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Look up a release by MusicBrainz ID
    pub async fn lookup_release(&self, release_id: &str) -> Result<dto::Release, MusicBrainzError> {
        let url = format!(
            "{}/release/{}?fmt=json&inc=url-rels+release-groups+artist-credits",
            self.base_url, release_id
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MusicBrainzError::NotFound);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        {
            return Err(MusicBrainzError::RateLimited);
        }

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(MusicBrainzError::ApiError(error.error));
            }
            return Err(MusicBrainzError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<dto::Release>()
            .await
            .map_err(|e| MusicBrainzError::Parse(e.to_string()))
    }
}
