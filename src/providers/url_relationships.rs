//! Direct image links derived from known shop pages.
//!
//! Some sites publish artwork at a URL that can be computed from the album
//! page URL. Each rule pairs a pattern with a `$n` template.

use regex::Regex;
use url::Url;

use super::{CoverArtProvider, ProviderContext, ProviderError, ProviderId, QueueOutcome};
use crate::cover::CoverArtImage;

struct SiteRule {
    name: &'static str,
    pattern: Regex,
    template: &'static str,
}

/// (name, pattern, image URL template)
const SITE_RULES: &[(&str, &str, &str)] = &[(
    "cdbaby",
    r"^https?://(?:www\.)?cdbaby\.com/cd/(\w)(\w)(\w*)",
    "http://cdbaby.name/${1}/${2}/${1}${2}${3}.jpg",
)];

pub struct UrlRelationshipsProvider {
    rules: Vec<SiteRule>,
}

impl UrlRelationshipsProvider {
    pub fn new() -> Self {
        let rules = SITE_RULES
            .iter()
            .filter_map(|&(name, pattern, template)| match Regex::new(pattern) {
                Ok(pattern) => Some(SiteRule {
                    name,
                    pattern,
                    template,
                }),
                Err(e) => {
                    tracing::error!(target: "coverart", site = name, "Invalid site rule: {}", e);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Image URL for a page on a known site.
    pub fn image_url_for(&self, page: &str) -> Option<Url> {
        self.rules.iter().find_map(|rule| {
            let captures = rule.pattern.captures(page)?;
            let mut expanded = String::new();
            captures.expand(rule.template, &mut expanded);
            match Url::parse(&expanded) {
                Ok(url) => {
                    tracing::debug!(target: "coverart", site = rule.name, url = %url, "Matched image site");
                    Some(url)
                }
                Err(e) => {
                    tracing::warn!(target: "coverart", site = rule.name, "Bad image URL {}: {}", expanded, e);
                    None
                }
            }
        })
    }
}

impl Default for UrlRelationshipsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverArtProvider for UrlRelationshipsProvider {
    fn name(&self) -> &str {
        ProviderId::UrlRelationships.name()
    }

    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool {
        ctx.config.providers.use_url_relationships && !ctx.front_image_found
    }

    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError> {
        let images = ctx
            .release
            .relations
            .iter()
            .filter_map(|relation| relation.url_resource())
            .filter_map(|page| self.image_url_for(page))
            .map(CoverArtImage::from_url)
            .collect();
        Ok(QueueOutcome::Finished(images))
    }
}
