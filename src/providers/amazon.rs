//! Amazon product images built from ASIN relationships.
//!
//! Image URLs follow a fixed template per regional store; nothing is probed.
//! Two resolution tiers are queued, large before medium, and broken links
//! are left for the session to report.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{CoverArtProvider, ProviderContext, ProviderError, ProviderId, QueueOutcome};
use crate::cover::CoverArtImage;

/// Relationship types carrying an Amazon product URL.
const ASIN_RELATION_TYPES: &[&str] = &["amazon asin", "has_Amazon_ASIN"];

/// Store host -> (image server, store id)
const AMAZON_SERVERS: &[(&str, &str, &str)] = &[
    ("amazon.jp", "ec1.images-amazon.com", "09"),
    ("amazon.co.jp", "ec1.images-amazon.com", "09"),
    ("amazon.co.uk", "ec1.images-amazon.com", "02"),
    ("amazon.de", "ec2.images-amazon.com", "03"),
    ("amazon.com", "ec1.images-amazon.com", "01"),
    ("amazon.ca", "ec1.images-amazon.com", "01"),
    ("amazon.fr", "ec1.images-amazon.com", "08"),
];

const DEFAULT_STORE: (&str, &str) = ("ec1.images-amazon.com", "01");

/// Large, then medium.
const SIZE_TIERS: [char; 2] = ['L', 'M'];

static AMAZON_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www.)?(?P<host>.*?)(?::[0-9]+)?/.*/(?P<asin>[0-9B][0-9A-Z]{9})(?:[^0-9A-Z]|$)")
        .expect("static regex")
});

/// Store host and ASIN of an Amazon product URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmazonProduct {
    pub host: String,
    pub asin: String,
}

pub fn parse_amazon_url(url: &str) -> Option<AmazonProduct> {
    let captures = AMAZON_URL.captures(url)?;
    Some(AmazonProduct {
        host: captures["host"].to_string(),
        asin: captures["asin"].to_string(),
    })
}

/// Candidate image URLs for a product, largest first. Unknown stores use
/// the amazon.com server.
pub fn image_urls(product: &AmazonProduct) -> Vec<Url> {
    let (server, store_id) = AMAZON_SERVERS
        .iter()
        .find(|(host, _, _)| *host == product.host)
        .map(|&(_, server, id)| (server, id))
        .unwrap_or(DEFAULT_STORE);

    SIZE_TIERS
        .iter()
        .filter_map(|tier| {
            let url = format!("http://{}/images/P/{}.{}.{}ZZZZZZZ.jpg", server, product.asin, store_id, tier);
            Url::parse(&url).ok()
        })
        .collect()
}

pub struct AmazonProvider;

impl CoverArtProvider for AmazonProvider {
    fn name(&self) -> &str {
        ProviderId::Amazon.name()
    }

    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool {
        ctx.config.providers.use_amazon && !ctx.front_image_found
    }

    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError> {
        let images = ctx
            .release
            .relations
            .iter()
            .filter(|relation| ASIN_RELATION_TYPES.contains(&relation.relation_type.as_str()))
            .filter_map(|relation| relation.url_resource())
            .filter_map(parse_amazon_url)
            .flat_map(|product| image_urls(&product))
            .map(CoverArtImage::from_url)
            .collect();
        Ok(QueueOutcome::Finished(images))
    }
}
