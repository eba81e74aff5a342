//! Cover art providers.
//!
//! A provider turns a release into candidate images. Synchronous providers
//! (local files, URL relationships) answer immediately with
//! [`QueueOutcome::Finished`]; providers that need a network round trip
//! answer with [`QueueOutcome::Wait`] and a future the session awaits before
//! moving on.
//!
//! The built-in set is closed and identified by [`ProviderId`]; the chain is
//! built in configured order by [`build_providers`].

pub mod amazon;
pub mod caa;
pub mod local;
pub mod url_relationships;
pub mod whitelist;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::cover::CoverArtImage;
use crate::metadata::Metadata;
use crate::musicbrainz::Release;
use crate::transport::{DownloadTransport, TransportError};

pub use amazon::AmazonProvider;
pub use caa::{CaaProvider, CaaTarget};
pub use local::LocalProvider;
pub use url_relationships::UrlRelationshipsProvider;
pub use whitelist::WhitelistProvider;

/// Provider failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Images a waiting provider delivers once its request completes.
pub type PendingImages = BoxFuture<'static, Result<Vec<CoverArtImage>, ProviderError>>;

/// Result of asking a provider for candidates.
pub enum QueueOutcome {
    /// Candidates are known right away.
    Finished(Vec<CoverArtImage>),
    /// Candidates arrive later; the session resumes when the future resolves.
    Wait(PendingImages),
}

impl fmt::Debug for QueueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished(images) => f.debug_tuple("Finished").field(&images.len()).finish(),
            Self::Wait(_) => f.write_str("Wait"),
        }
    }
}

/// What a provider sees of the running session.
pub struct ProviderContext<'a> {
    pub release: &'a Release,
    pub metadata: &'a Metadata,
    pub files: &'a [PathBuf],
    pub config: &'a Config,
    /// A front image was already accepted in this session
    pub front_image_found: bool,
}

/// A source of candidate images.
pub trait CoverArtProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether to ask this provider at all. Built-in providers are gated on
    /// their config flag and step aside once a front image was found.
    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool;

    /// Produce candidates, now or later.
    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError>;
}

/// The built-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Local,
    Caa,
    CaaReleaseGroup,
    UrlRelationships,
    Whitelist,
    Amazon,
}

impl ProviderId {
    /// Default priority order.
    pub const ALL: [ProviderId; 6] = [
        ProviderId::Local,
        ProviderId::Caa,
        ProviderId::CaaReleaseGroup,
        ProviderId::UrlRelationships,
        ProviderId::Whitelist,
        ProviderId::Amazon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "Local Files",
            Self::Caa => "Cover Art Archive",
            Self::CaaReleaseGroup => "CAA Release Group",
            Self::UrlRelationships => "URL Relationships",
            Self::Whitelist => "Whitelist",
            Self::Amazon => "Amazon",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instantiate the configured provider chain, in priority order.
///
/// Disabled providers are still built; they report themselves disabled when
/// the session asks. Duplicate ids are ignored.
pub fn build_providers(
    config: &Config,
    transport: Arc<dyn DownloadTransport>,
) -> Result<Vec<Box<dyn CoverArtProvider>>, ProviderError> {
    let mut seen = Vec::new();
    let mut providers: Vec<Box<dyn CoverArtProvider>> = Vec::new();

    for &id in &config.providers.order {
        if seen.contains(&id) {
            tracing::warn!(target: "coverart", provider = %id, "Ignoring duplicate provider");
            continue;
        }
        seen.push(id);

        let provider: Box<dyn CoverArtProvider> = match id {
            ProviderId::Local => Box::new(LocalProvider::new(&config.local.cover_regex)?),
            ProviderId::Caa => Box::new(CaaProvider::new(CaaTarget::Release, Arc::clone(&transport))),
            ProviderId::CaaReleaseGroup => Box::new(CaaProvider::new(
                CaaTarget::ReleaseGroup,
                Arc::clone(&transport),
            )),
            ProviderId::UrlRelationships => Box::new(UrlRelationshipsProvider::new()),
            ProviderId::Whitelist => Box::new(WhitelistProvider),
            ProviderId::Amazon => Box::new(AmazonProvider),
        };
        providers.push(provider);
    }

    Ok(providers)
}
