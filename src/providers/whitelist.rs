//! URLs editors marked as cover art links.

use url::Url;

use super::{CoverArtProvider, ProviderContext, ProviderError, ProviderId, QueueOutcome};
use crate::cover::CoverArtImage;

/// Relationship types pointing straight at an image.
const COVER_ART_LINK_TYPES: &[&str] = &["cover art link", "has_cover_art_at"];

pub struct WhitelistProvider;

impl CoverArtProvider for WhitelistProvider {
    fn name(&self) -> &str {
        ProviderId::Whitelist.name()
    }

    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool {
        ctx.config.providers.use_whitelist && !ctx.front_image_found
    }

    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError> {
        let mut images = Vec::new();
        for relation in &ctx.release.relations {
            if !COVER_ART_LINK_TYPES.contains(&relation.relation_type.as_str()) {
                continue;
            }
            let Some(resource) = relation.url_resource() else {
                continue;
            };
            match Url::parse(resource) {
                Ok(url) => images.push(CoverArtImage::from_url(url)),
                Err(e) => tracing::warn!(target: "coverart", url = resource, "Skipping cover art link: {}", e),
            }
        }
        Ok(QueueOutcome::Finished(images))
    }
}
