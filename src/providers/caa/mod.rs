//! Cover Art Archive provider.
//!
//! Fetches the JSON manifest for a release (or, in the fallback variant,
//! its release group) and turns the entries into archive images:
//!
//! 1. Unapproved entries are dropped when `approved_only` is set
//! 2. PDFs are dropped unless images are also saved to files
//! 3. With `restrict_image_types`, an entry needs a wanted type and no
//!    omitted type
//! 4. The largest thumbnail not exceeding `image_size` is preferred over
//!    the full image
//! 5. A PDF gets a raster thumbnail queued right before it
//!
//! The manifest request is the only network call; images are downloaded
//! later by the session.

pub mod dto;

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use super::{CoverArtProvider, ProviderContext, ProviderError, ProviderId, QueueOutcome};
use crate::config::{CaaConfig, SavingConfig};
use crate::cover::types::{intersects, lowercase_types, UNKNOWN};
use crate::cover::{Capabilities, CoverArtImage, ImageTypes};
use crate::musicbrainz::dto::CoverArtArchive;
use crate::transport::{DownloadRequest, DownloadTransport, TransportError};

pub use dto::{CaaImage, CaaManifest};

/// Thumbnail sizes, largest first, with the legacy key each one may be
/// published under.
const THUMBNAIL_SIZES: [(i32, &str, Option<&str>); 3] =
    [(1200, "1200", None), (500, "500", Some("large")), (250, "250", Some("small"))];

/// Which manifest to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaaTarget {
    Release,
    /// Shared artwork of all editions; a missing manifest is not an error
    ReleaseGroup,
}

pub struct CaaProvider {
    target: CaaTarget,
    transport: Arc<dyn DownloadTransport>,
}

impl CaaProvider {
    pub fn new(target: CaaTarget, transport: Arc<dyn DownloadTransport>) -> Self {
        Self { target, transport }
    }

    fn id(&self) -> ProviderId {
        match self.target {
            CaaTarget::Release => ProviderId::Caa,
            CaaTarget::ReleaseGroup => ProviderId::CaaReleaseGroup,
        }
    }

    fn manifest_url(&self, ctx: &ProviderContext<'_>) -> Result<Url, ProviderError> {
        let base = ctx.config.caa.base_url.trim_end_matches('/');
        let url = match self.target {
            CaaTarget::Release => format!("{}/release/{}/", base, ctx.release.id),
            CaaTarget::ReleaseGroup => {
                let group_id = ctx
                    .release
                    .release_group
                    .as_ref()
                    .map(|rg| rg.id.as_str())
                    .unwrap_or_default();
                format!("{}/release-group/{}/", base, group_id)
            }
        };
        Url::parse(&url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")).into())
    }
}

impl CoverArtProvider for CaaProvider {
    fn name(&self) -> &str {
        self.id().name()
    }

    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool {
        if !ctx.config.providers.is_enabled(self.id()) || ctx.front_image_found {
            return false;
        }
        let caa = &ctx.config.caa;
        if caa.restrict_image_types && caa.image_types.is_empty() {
            tracing::debug!(target: "coverart", "All Cover Art Archive types are disabled");
            return false;
        }
        match self.target {
            CaaTarget::Release => {
                let suitable = has_suitable_artwork(ctx.release.cover_art_archive.as_ref(), caa);
                tracing::debug!(
                    target: "coverart",
                    release = %ctx.release.id,
                    suitable,
                    "Checked Cover Art Archive summary"
                );
                suitable
            }
            CaaTarget::ReleaseGroup => ctx.release.release_group.is_some(),
        }
    }

    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError> {
        let url = self.manifest_url(ctx)?;
        let request = DownloadRequest::from_url(&url)?
            .with_priority(true)
            .with_important(false);

        let transport = Arc::clone(&self.transport);
        let caa = ctx.config.caa.clone();
        let saving = ctx.config.saving.clone();
        let ignore_not_found = self.target == CaaTarget::ReleaseGroup;

        tracing::debug!(target: "coverart", url = %url, "Requesting Cover Art Archive manifest");

        Ok(QueueOutcome::Wait(Box::pin(async move {
            let json = match transport.get_json(&request).await {
                Ok(json) => json,
                Err(TransportError::NotFound) if ignore_not_found => {
                    tracing::debug!(target: "coverart", url = %request, "No release group artwork");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e.into()),
            };
            let manifest: CaaManifest = serde_json::from_value(json)?;
            Ok(select_images(&manifest, &caa, &saving))
        })))
    }
}

/// Whether the release's archive summary promises anything worth fetching.
///
/// Only the common wishes (front and/or back) can be checked up front; any
/// other type selection is assumed satisfiable whenever there is artwork.
pub fn has_suitable_artwork(summary: Option<&CoverArtArchive>, caa: &CaaConfig) -> bool {
    let Some(summary) = summary else {
        return false;
    };
    if !summary.artwork {
        return false;
    }
    if !caa.restrict_image_types {
        return true;
    }

    let wanted = lowercase_types(&caa.image_types);
    let want_front = wanted.iter().any(|t| t == "front");
    let want_back = wanted.iter().any(|t| t == "back");

    match wanted.len() {
        2 if want_front || want_back => {
            (summary.front || !want_front) || (summary.back || !want_back)
        }
        1 if want_front || want_back => {
            (summary.front && want_front) || (summary.back && want_back)
        }
        _ => true,
    }
}

/// Rendition URLs no larger than `desired_size`, largest first.
///
/// Empty for the full-size setting (-1) or when no rendition fits.
pub fn url_fallback_list(desired_size: i32, thumbnails: &HashMap<String, String>) -> Vec<String> {
    THUMBNAIL_SIZES
        .iter()
        .filter(|(size, _, _)| desired_size != -1 && *size <= desired_size)
        .filter_map(|(_, key, alias)| {
            thumbnails
                .get(*key)
                .or_else(|| alias.and_then(|a| thumbnails.get(a)))
                .cloned()
        })
        .collect()
}

/// Turn manifest entries into candidates, in manifest order.
pub fn select_images(manifest: &CaaManifest, caa: &CaaConfig, saving: &SavingConfig) -> Vec<CoverArtImage> {
    let wanted = lowercase_types(&caa.image_types);
    let omitted = lowercase_types(&caa.image_types_to_omit);
    if caa.restrict_image_types {
        tracing::debug!(target: "coverart", ?wanted, ?omitted, "CAA type restriction");
    }

    let mut images = Vec::new();
    for entry in &manifest.images {
        if caa.approved_only && !entry.approved {
            continue;
        }
        let is_pdf = entry.is_pdf();
        if is_pdf && !saving.save_images_to_files {
            tracing::debug!(target: "coverart", url = %entry.image, "Skipping PDF cover art");
            continue;
        }

        let types: ImageTypes = if entry.types.is_empty() {
            smallvec::smallvec![UNKNOWN.to_string()]
        } else {
            lowercase_types(&entry.types)
        };

        if caa.restrict_image_types {
            let accepted = intersects(&types, &wanted) && !intersects(&types, &omitted);
            tracing::debug!(
                target: "coverart",
                url = %entry.image,
                ?types,
                accepted,
                "CAA image type check"
            );
            if !accepted {
                continue;
            }
        }

        let urls = url_fallback_list(caa.image_size, &entry.thumbnails);
        let chosen = match urls.first() {
            Some(thumb) if !is_pdf => thumb.as_str(),
            _ => entry.image.as_str(),
        };
        let Some(url) = parse_url(chosen) else {
            continue;
        };

        let mut image = CoverArtImage::archive(url, types.clone(), entry.front, entry.comment.clone());

        if is_pdf {
            if let Some(thumb_url) = urls.first().and_then(|u| parse_url(u)) {
                images.push(CoverArtImage::archive_thumbnail(
                    thumb_url.clone(),
                    types,
                    entry.comment.clone(),
                ));
                image = image
                    .with_thumbnail_url(thumb_url)
                    .without_capabilities(Capabilities::SAVE_TO_TAGS);
            }
        }
        images.push(image);

        if saving.save_only_one_front_image && saving.save_images_to_files && entry.front {
            break;
        }
    }

    images
}

fn parse_url(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(target: "coverart", url, "Skipping malformed CAA URL: {}", e);
            None
        }
    }
}
