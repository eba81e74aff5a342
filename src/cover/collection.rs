//! Ordered, de-duplicating image collection attached to metadata.

use std::collections::HashMap;
use std::sync::Arc;

use super::image::CoverArtImage;
use crate::config::SavingConfig;

/// Images accepted for a release or track, in acceptance order.
///
/// Entries are shared (`Arc`) so the same image can sit in several
/// collections, e.g. an album and each of its tracks.
#[derive(Debug, Clone, Default)]
pub struct ImageList {
    images: Vec<Arc<CoverArtImage>>,
}

impl ImageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an equal image is already present.
    ///
    /// Returns whether the image was added.
    pub fn append(&mut self, image: Arc<CoverArtImage>) -> bool {
        if self.images.iter().any(|existing| **existing == *image) {
            return false;
        }
        self.images.push(image);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CoverArtImage>> {
        self.images.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<CoverArtImage>> {
        self.images.get(index)
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// First image considered a front cover.
    pub fn get_front_image(&self) -> Option<&Arc<CoverArtImage>> {
        self.images.iter().find(|image| image.is_front_image())
    }

    /// Remove every front image.
    pub fn strip_front_images(&mut self) {
        self.images.retain(|image| !image.is_front_image());
    }

    /// Images to embed in file tags under the given saving options.
    ///
    /// With `embed_only_one_front_image` this is at most the first
    /// embeddable front image.
    pub fn to_be_saved_to_tags(&self, options: &SavingConfig) -> Vec<Arc<CoverArtImage>> {
        if !options.save_images_to_tags {
            return Vec::new();
        }
        let embeddable = self.images.iter().filter(|image| image.can_be_saved_to_tags());
        if options.embed_only_one_front_image {
            embeddable
                .filter(|image| image.is_front_image())
                .take(1)
                .cloned()
                .collect()
        } else {
            embeddable.cloned().collect()
        }
    }

    /// Images keyed by content hash. Images without data are left out.
    pub fn hash_dict(&self) -> HashMap<String, Arc<CoverArtImage>> {
        self.images
            .iter()
            .filter_map(|image| Some((image.content_hash()?.to_string(), Arc::clone(image))))
            .collect()
    }

    /// Images keyed by their normalized type list (first one wins).
    pub fn by_types(&self) -> HashMap<Vec<String>, Arc<CoverArtImage>> {
        let mut map = HashMap::new();
        for image in &self.images {
            map.entry(image.normalized_types())
                .or_insert_with(|| Arc::clone(image));
        }
        map
    }

    fn sorted(&self) -> Vec<&Arc<CoverArtImage>> {
        let mut images: Vec<_> = self.images.iter().collect();
        images.sort_by_cached_key(|image| image.normalized_types());
        images
    }
}

/// Order-insensitive comparison.
impl PartialEq for ImageList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .sorted()
                .iter()
                .zip(other.sorted().iter())
                .all(|(a, b)| ***a == ***b)
    }
}

impl FromIterator<Arc<CoverArtImage>> for ImageList {
    fn from_iter<T: IntoIterator<Item = Arc<CoverArtImage>>>(iter: T) -> Self {
        let mut list = Self::new();
        for image in iter {
            list.append(image);
        }
        list
    }
}

impl<'a> IntoIterator for &'a ImageList {
    type Item = &'a Arc<CoverArtImage>;
    type IntoIter = std::slice::Iter<'a, Arc<CoverArtImage>>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}
