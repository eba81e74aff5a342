//! Crate-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error enum
//! - Module-specific errors (e.g. [`CoverArtImageError`], [`ProviderError`])
//!   for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use cover_minder::error::{Result, ResultExt};
//!
//! fn load_pictures(path: &Path, store: &ContentStore) -> Result<usize> {
//!     let images = read_tag_images(path, store).with_context("reading tags")?;
//!     Ok(images.len())
//! }
//! ```

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::cover::CoverArtImageError;
use crate::musicbrainz::MusicBrainzError;
use crate::processing::ProcessingError;
use crate::providers::ProviderError;
use crate::transport::TransportError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio tag reading error
    #[error("Tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    /// Image identification or temp storage error
    #[error(transparent)]
    Image(#[from] CoverArtImageError),

    /// Download error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Provider failure
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Resize/convert failure
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Release lookup failure
    #[error("MusicBrainz error: {0}")]
    MusicBrainz(#[from] MusicBrainzError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, CoverArtImageError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Image(e).context(ctx))
    }
}
