//! Predicates deciding whether a downloaded image may be accepted.
//!
//! Filters see the raw bytes, the identified info, the candidate and the
//! images already embedded in the release's files. A [`FilterChain`] runs
//! them in registration order and stops at the first rejection.

use crate::config::{Config, FiltersConfig};
use crate::cover::{CoverArtImage, ImageInfo, ImageList};

/// What a filter may look at besides the image itself.
pub struct FilterContext<'a> {
    /// Images found in the files' tags before retrieval started
    pub original_images: &'a ImageList,
}

pub trait ImageFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` to let the image through.
    fn accept(&self, data: &[u8], info: &ImageInfo, image: &CoverArtImage, ctx: &FilterContext<'_>) -> bool;
}

/// Rejects images below a minimum size. Unknown dimensions pass.
pub struct SizeFilter {
    pub min_width: u32,
    pub min_height: u32,
}

impl ImageFilter for SizeFilter {
    fn name(&self) -> &'static str {
        "size"
    }

    fn accept(&self, _data: &[u8], info: &ImageInfo, _image: &CoverArtImage, _ctx: &FilterContext<'_>) -> bool {
        // Formats without pixel dimensions report 0x0
        if !info.format.is_raster() {
            return true;
        }
        let accepted = info.width >= self.min_width && info.height >= self.min_height;
        if !accepted {
            tracing::debug!(
                target: "coverart",
                width = info.width,
                height = info.height,
                "Image is below the minimum size {}x{}",
                self.min_width,
                self.min_height
            );
        }
        accepted
    }
}

/// Keeps an embedded image when the candidate with the same types is
/// smaller in either dimension.
pub struct DontReplaceWithSmallerFilter;

impl ImageFilter for DontReplaceWithSmallerFilter {
    fn name(&self) -> &'static str {
        "dont_replace_with_smaller"
    }

    fn accept(&self, _data: &[u8], info: &ImageInfo, image: &CoverArtImage, ctx: &FilterContext<'_>) -> bool {
        let previous = ctx.original_images.by_types();
        let Some(previous) = previous.get(&image.normalized_types()) else {
            return true;
        };
        let (Some(width), Some(height)) = (previous.width(), previous.height()) else {
            return true;
        };
        if info.width < width || info.height < height {
            tracing::debug!(
                target: "coverart",
                image = %image,
                "Skipping cover art, the embedded image is bigger ({}x{})",
                width,
                height
            );
            return false;
        }
        true
    }
}

/// Keeps embedded images of protected types.
///
/// A candidate is rejected when it shares a type with an embedded image and
/// one of its types is in `never_replace`, unless one of its types is in
/// `always_replace`.
pub struct DontReplaceIncludedTypesFilter {
    pub never_replace: Vec<String>,
    pub always_replace: Vec<String>,
}

impl ImageFilter for DontReplaceIncludedTypesFilter {
    fn name(&self) -> &'static str {
        "dont_replace_included_types"
    }

    fn accept(&self, _data: &[u8], _info: &ImageInfo, image: &CoverArtImage, ctx: &FilterContext<'_>) -> bool {
        let downloaded = image.normalized_types();
        if downloaded.iter().any(|t| self.always_replace.contains(t)) {
            return true;
        }
        let protected = downloaded.iter().any(|t| self.never_replace.contains(t));
        if !protected {
            return true;
        }
        let already_embedded = ctx
            .original_images
            .by_types()
            .keys()
            .any(|types| types.iter().any(|t| downloaded.contains(t)));
        if already_embedded {
            tracing::debug!(
                target: "coverart",
                image = %image,
                "Not replacing embedded image of types {:?}",
                downloaded
            );
            return false;
        }
        true
    }
}

/// Filters applied to every downloaded image, in order.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ImageFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The filters switched on in `config`. The don't-replace filters only
    /// matter when images are embedded in tags.
    pub fn from_config(config: &Config) -> Self {
        let FiltersConfig {
            filter_by_size,
            minimum_width,
            minimum_height,
            dont_replace_with_smaller,
            dont_replace_included_types,
            never_replace_types,
            always_replace_types,
        } = &config.filters;
        let to_tags = config.saving.save_images_to_tags;

        let mut chain = Self::new();
        if *filter_by_size {
            chain = chain.with_filter(SizeFilter {
                min_width: *minimum_width,
                min_height: *minimum_height,
            });
        }
        if *dont_replace_with_smaller && to_tags {
            chain = chain.with_filter(DontReplaceWithSmallerFilter);
        }
        if *dont_replace_included_types && to_tags {
            chain = chain.with_filter(DontReplaceIncludedTypesFilter {
                never_replace: lowercase(never_replace_types),
                always_replace: lowercase(always_replace_types),
            });
        }
        chain
    }

    pub fn with_filter(mut self, filter: impl ImageFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// All filters must accept. Stops at the first rejection.
    pub fn run(&self, data: &[u8], info: &ImageInfo, image: &CoverArtImage, ctx: &FilterContext<'_>) -> bool {
        for filter in &self.filters {
            if !filter.accept(data, info, image, ctx) {
                tracing::debug!(target: "coverart", filter = filter.name(), image = %image, "Image rejected");
                return false;
            }
        }
        true
    }
}

fn lowercase(types: &[String]) -> Vec<String> {
    types.iter().map(|t| t.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::cover::{identify, ContentStore, ImageTypes};
    use crate::test_utils::{fake_png, padded, temp_store};

    fn info(width: u32, height: u32) -> ImageInfo {
        identify(&padded(fake_png(width, height), 1024)).unwrap()
    }

    fn candidate(types: &[&str]) -> CoverArtImage {
        let types: ImageTypes = types.iter().map(|t| t.to_string()).collect();
        CoverArtImage::archive(Url::parse("http://example.com/a.png").unwrap(), types, false, "")
    }

    fn embedded(store: &ContentStore, types: &[&str], width: u32, height: u32) -> Arc<CoverArtImage> {
        let types: ImageTypes = types.iter().map(|t| t.to_string()).collect();
        let image = CoverArtImage::from_tag("/music/01.flac", Some("Vorbis".into()), true, false)
            .with_types(types)
            .with_data(store, &padded(fake_png(width, height), 1024))
            .unwrap();
        Arc::new(image)
    }

    /// Counts how often it is asked.
    struct CountingFilter(Arc<AtomicUsize>);

    impl ImageFilter for CountingFilter {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn accept(&self, _: &[u8], _: &ImageInfo, _: &CoverArtImage, _: &FilterContext<'_>) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn test_size_filter() {
        let filter = SizeFilter {
            min_width: 250,
            min_height: 250,
        };
        let ctx = FilterContext {
            original_images: &ImageList::new(),
        };
        let image = candidate(&["front"]);

        assert!(filter.accept(&[], &info(250, 250), &image, &ctx));
        assert!(!filter.accept(&[], &info(249, 500), &image, &ctx));
        assert!(!filter.accept(&[], &info(500, 100), &image, &ctx));
    }

    #[test]
    fn test_size_failure_short_circuits_chain() {
        let counter = Arc::new(AtomicUsize::new(0));
        let chain = FilterChain::new()
            .with_filter(SizeFilter {
                min_width: 500,
                min_height: 500,
            })
            .with_filter(CountingFilter(Arc::clone(&counter)));
        let ctx = FilterContext {
            original_images: &ImageList::new(),
        };
        let image = candidate(&["front"]);

        assert!(!chain.run(&[], &info(100, 100), &image, &ctx));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert!(chain.run(&[], &info(600, 600), &image, &ctx));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dont_replace_with_smaller() {
        let (store, _dir) = temp_store();
        let mut originals = ImageList::new();
        originals.append(embedded(&store, &["front"], 600, 600));
        let ctx = FilterContext {
            original_images: &originals,
        };

        let front = candidate(&["front"]);
        assert!(!DontReplaceWithSmallerFilter.accept(&[], &info(500, 700), &front, &ctx));
        assert!(DontReplaceWithSmallerFilter.accept(&[], &info(600, 600), &front, &ctx));

        // No embedded image with the same types
        let back = candidate(&["back"]);
        assert!(DontReplaceWithSmallerFilter.accept(&[], &info(100, 100), &back, &ctx));
    }

    #[test]
    fn test_dont_replace_included_types() {
        let (store, _dir) = temp_store();
        let mut originals = ImageList::new();
        originals.append(embedded(&store, &["front"], 300, 300));
        let ctx = FilterContext {
            original_images: &originals,
        };
        let filter = DontReplaceIncludedTypesFilter {
            never_replace: vec!["front".to_string()],
            always_replace: vec!["booklet".to_string()],
        };

        assert!(!filter.accept(&[], &info(1000, 1000), &candidate(&["front"]), &ctx));
        assert!(filter.accept(&[], &info(1000, 1000), &candidate(&["back"]), &ctx));
        assert!(filter.accept(&[], &info(1000, 1000), &candidate(&["front", "booklet"]), &ctx));

        let empty = ImageList::new();
        let nothing_embedded = FilterContext {
            original_images: &empty,
        };
        assert!(filter.accept(&[], &info(1000, 1000), &candidate(&["front"]), &nothing_embedded));
    }

    #[test]
    fn test_chain_from_config() {
        let mut config = Config::default();
        assert!(FilterChain::from_config(&config).is_empty());

        config.filters.filter_by_size = true;
        config.filters.dont_replace_with_smaller = true;
        config.filters.dont_replace_included_types = true;
        assert_eq!(FilterChain::from_config(&config).len(), 3);

        config.saving.save_images_to_tags = false;
        assert_eq!(FilterChain::from_config(&config).len(), 1);
    }
}
