//! The cover art candidate model.
//!
//! A [`CoverArtImage`] describes one image a provider discovered: where it
//! lives, which types it claims, and what it may be used for. Once data has
//! been downloaded it holds a reference into the [`ContentStore`] together
//! with the identified [`ImageInfo`].
//!
//! Images are built through constructors and `with_*` builders; after that
//! only the content can change (via [`CoverArtImage::set_data`]).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;
use url::Url;

use super::imageinfo::{IdentificationError, ImageInfo, identify};
use super::naming::{image_filename, sanitize_filename};
use super::store::{BlobHandle, ContentStore};
use super::types::{FRONT, ImageTypes};
use crate::config::SavingConfig;
use crate::metadata::Metadata;

bitflags! {
    /// What an image may be used for once accepted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Embeddable into file tags.
        const SAVE_TO_TAGS = 1;
        /// Writable as a separate image file.
        const SAVE_TO_DISK = 1 << 1;
        /// Eligible for the release's metadata image list.
        const SAVE_TO_METADATA = 1 << 2;
    }
}

/// Errors raised while setting or saving image data.
#[derive(Debug, thiserror::Error)]
pub enum CoverArtImageError {
    #[error("Image identification failed: {0}")]
    Identification(#[from] IdentificationError),

    #[error("Image I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageKind {
    /// Plain URL found in relationships or built from a template.
    Url,
    /// Cover Art Archive manifest entry.
    Archive,
    /// Raster stand-in for a non-raster archive entry. Display only.
    ArchiveThumbnail,
    /// Picture read from an audio file's tags.
    Tag { file: PathBuf, tag: Option<String> },
    /// Image file found next to the audio files.
    LocalFile,
}

/// Source locator of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(Url),
    Path(PathBuf),
}

impl Locator {
    /// Local path for `Path` locators and `file://` URLs.
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path.clone()),
            Self::Url(url) if url.scheme() == "file" => url.to_file_path().ok(),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Identified data plus its reference into the content store.
#[derive(Debug)]
struct StoredContent {
    info: ImageInfo,
    blob: BlobHandle,
}

impl StoredContent {
    fn new(store: &ContentStore, data: &[u8]) -> Result<Self, CoverArtImageError> {
        let info = identify(data)?;
        let blob = store.store(data, info.extension())?;
        Ok(Self { info, blob })
    }
}

/// One cover art candidate.
#[derive(Debug)]
pub struct CoverArtImage {
    kind: ImageKind,
    locator: Option<Locator>,
    types: ImageTypes,
    is_front: Option<bool>,
    comment: String,
    support_types: bool,
    support_multi_types: bool,
    capabilities: Capabilities,
    content: Option<StoredContent>,
    /// Separately processed rendition used when saving to disk.
    external_file: Option<StoredContent>,
    thumbnail: Option<Arc<CoverArtImage>>,
    thumbnail_url: Option<Url>,
}

impl CoverArtImage {
    fn new(kind: ImageKind, locator: Option<Locator>) -> Self {
        Self {
            kind,
            locator,
            types: ImageTypes::new(),
            is_front: None,
            comment: String::new(),
            support_types: false,
            support_multi_types: false,
            capabilities: Capabilities::all(),
            content: None,
            external_file: None,
            thumbnail: None,
            thumbnail_url: None,
        }
    }

    /// An untyped image at a URL.
    pub fn from_url(url: Url) -> Self {
        Self::new(ImageKind::Url, Some(Locator::Url(url)))
    }

    /// An image without a locator, e.g. built directly from data.
    pub fn unlocated() -> Self {
        Self::new(ImageKind::Url, None)
    }

    /// A Cover Art Archive image with server-provided types and front flag.
    pub fn archive(url: Url, types: ImageTypes, is_front: bool, comment: impl Into<String>) -> Self {
        let mut image = Self::new(ImageKind::Archive, Some(Locator::Url(url)));
        image.types = types;
        image.is_front = Some(is_front);
        image.comment = comment.into();
        image.support_types = true;
        image.support_multi_types = true;
        image
    }

    /// Raster stand-in for a non-raster archive image. Never saved anywhere.
    pub fn archive_thumbnail(url: Url, types: ImageTypes, comment: impl Into<String>) -> Self {
        let mut image = Self::archive(url, types, false, comment);
        image.kind = ImageKind::ArchiveThumbnail;
        image.capabilities = Capabilities::empty();
        image
    }

    /// A picture read from an audio file's tag.
    pub fn from_tag(
        file: impl Into<PathBuf>,
        tag: Option<String>,
        support_types: bool,
        support_multi_types: bool,
    ) -> Self {
        let mut image = Self::new(
            ImageKind::Tag {
                file: file.into(),
                tag,
            },
            None,
        );
        image.support_types = support_types;
        image.support_multi_types = support_multi_types;
        image
    }

    /// An image file on the local filesystem.
    pub fn local_file(
        path: impl Into<PathBuf>,
        types: ImageTypes,
        support_types: bool,
        support_multi_types: bool,
    ) -> Self {
        let mut image = Self::new(ImageKind::LocalFile, Some(Locator::Path(path.into())));
        image.types = types;
        image.support_types = support_types;
        image.support_multi_types = support_multi_types;
        image
    }

    pub fn with_types(mut self, types: ImageTypes) -> Self {
        self.types = types;
        self
    }

    pub fn with_is_front(mut self, is_front: Option<bool>) -> Self {
        self.is_front = is_front;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_type_support(mut self, support_types: bool, support_multi_types: bool) -> Self {
        self.support_types = support_types;
        self.support_multi_types = support_multi_types;
        self
    }

    pub fn without_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities.remove(capabilities);
        self
    }

    /// Record the URL of the raster thumbnail queued for this image.
    pub fn with_thumbnail_url(mut self, url: Url) -> Self {
        self.thumbnail_url = Some(url);
        self
    }

    /// Identify and store `data` right away.
    pub fn with_data(mut self, store: &ContentStore, data: &[u8]) -> Result<Self, CoverArtImageError> {
        self.set_data(store, data)?;
        Ok(self)
    }

    pub fn kind(&self) -> &ImageKind {
        &self.kind
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.locator {
            Some(Locator::Url(url)) => Some(url),
            _ => None,
        }
    }

    /// Local path to read synchronously instead of downloading.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.locator.as_ref().and_then(Locator::local_path)
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn support_types(&self) -> bool {
        self.support_types
    }

    pub fn support_multi_types(&self) -> bool {
        self.support_multi_types
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn can_be_saved_to_tags(&self) -> bool {
        self.capabilities.contains(Capabilities::SAVE_TO_TAGS)
    }

    pub fn can_be_saved_to_disk(&self) -> bool {
        self.capabilities.contains(Capabilities::SAVE_TO_DISK)
    }

    pub fn can_be_saved_to_metadata(&self) -> bool {
        self.capabilities.contains(Capabilities::SAVE_TO_METADATA)
    }

    pub fn thumbnail(&self) -> Option<&Arc<CoverArtImage>> {
        self.thumbnail.as_ref()
    }

    pub fn set_thumbnail(&mut self, thumbnail: Arc<CoverArtImage>) {
        self.thumbnail = Some(thumbnail);
    }

    pub fn thumbnail_url(&self) -> Option<&Url> {
        self.thumbnail_url.as_ref()
    }

    /// Replace the image data.
    ///
    /// The previously held store reference is released first, then the new
    /// bytes are identified and stored.
    pub fn set_data(&mut self, store: &ContentStore, data: &[u8]) -> Result<(), CoverArtImageError> {
        if let Some(old) = self.content.take() {
            old.blob.release();
        }
        self.content = Some(StoredContent::new(store, data)?);
        Ok(())
    }

    /// Store a separately processed rendition for saving to disk.
    pub fn set_external_file_data(
        &mut self,
        store: &ContentStore,
        data: &[u8],
    ) -> Result<(), CoverArtImageError> {
        if let Some(old) = self.external_file.take() {
            old.blob.release();
        }
        self.external_file = Some(StoredContent::new(store, data)?);
        Ok(())
    }

    pub fn has_data(&self) -> bool {
        self.content.is_some()
    }

    /// The stored bytes.
    pub fn data(&self) -> Result<Vec<u8>, CoverArtImageError> {
        Ok(self.stored()?.blob.read()?)
    }

    /// The bytes written by [`save`](Self::save): the external rendition if
    /// one was set, the main data otherwise.
    pub fn external_file_data(&self) -> Result<Vec<u8>, CoverArtImageError> {
        Ok(self.external_or_main()?.blob.read()?)
    }

    pub fn info(&self) -> Option<&ImageInfo> {
        self.content.as_ref().map(|c| &c.info)
    }

    pub fn width(&self) -> Option<u32> {
        self.info().map(|i| i.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.info().map(|i| i.height)
    }

    /// Content hash of the stored data.
    pub fn content_hash(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.blob.hash())
    }

    /// Backing temp file of the stored data.
    pub fn temp_path(&self) -> Option<&Path> {
        self.content.as_ref().map(|c| c.blob.path())
    }

    /// Drop the store references held by this image.
    pub fn release(&mut self) {
        for content in [self.content.take(), self.external_file.take()].into_iter().flatten() {
            content.blob.release();
        }
    }

    pub fn is_front_image(&self) -> bool {
        if !self.can_be_saved_to_metadata() {
            return false;
        }
        if let Some(is_front) = self.is_front {
            return is_front;
        }
        if self.types.iter().any(|t| t == FRONT) {
            return true;
        }
        // An untyped image from a source without types is assumed to be a cover
        !self.support_types
    }

    /// The single type used for naming and comparisons.
    ///
    /// With several non-front types the first one wins.
    pub fn main_type(&self) -> &str {
        if self.is_front_image() || self.types.is_empty() || self.types.iter().any(|t| t == FRONT) {
            return FRONT;
        }
        &self.types[0]
    }

    /// Sorted, de-duplicated types; `["front"]` for an untyped front image
    /// and `["-"]` when nothing is known.
    pub fn normalized_types(&self) -> Vec<String> {
        if !self.types.is_empty() {
            let mut types: Vec<String> = self.types.to_vec();
            types.sort();
            types.dedup();
            types
        } else if self.is_front_image() {
            vec![FRONT.to_string()]
        } else {
            vec!["-".to_string()]
        }
    }

    pub fn types_as_string(&self) -> String {
        self.normalized_types().join(", ")
    }

    /// Human readable description of where the image comes from.
    pub fn source(&self) -> String {
        match &self.kind {
            ImageKind::Tag { file, tag: Some(tag) } => format!("Tag {} from {}", tag, file.display()),
            ImageKind::Tag { file, tag: None } => format!("File {}", file.display()),
            kind => {
                let prefix = match kind {
                    ImageKind::Archive | ImageKind::ArchiveThumbnail => "CAA",
                    ImageKind::LocalFile => "LOCAL",
                    _ => "URL",
                };
                match &self.locator {
                    Some(locator) => format!("{prefix}: {locator}"),
                    None => prefix.to_string(),
                }
            }
        }
    }

    /// Dimensions, MIME type and temp file, empty before data is set.
    pub fn imageinfo_as_string(&self) -> String {
        match &self.content {
            Some(content) => format!("{} file={}", content.info, content.blob.path().display()),
            None => String::new(),
        }
    }

    /// Write the image next to the audio files.
    ///
    /// The name comes from `options.cover_image_filename` (or the main type
    /// for non-front images when `image_type_as_filename` is set). `counters`
    /// tracks names already used in this save run; colliding names get a
    /// " (n)" suffix. An existing file of identical size is treated as the
    /// same image and left alone, also when overwriting. Other existing files
    /// are replaced when overwriting and skipped past otherwise.
    ///
    /// Returns the written path, or `None` when nothing was written.
    pub fn save(
        &self,
        dirname: &Path,
        metadata: &Metadata,
        counters: &mut HashMap<PathBuf, u32>,
        options: &SavingConfig,
    ) -> Result<Option<PathBuf>, CoverArtImageError> {
        if !self.can_be_saved_to_disk() {
            return Ok(None);
        }

        let template = if options.image_type_as_filename && !self.is_front_image() {
            sanitize_filename(self.main_type())
        } else {
            options.cover_image_filename.clone()
        };
        let base = image_filename(&template, dirname, metadata);

        let content = self.external_or_main()?;
        let extension = content.info.extension();
        let data_len = content.info.data_len as u64;

        let mut candidate = next_filename(&base, counters);
        loop {
            let target = with_suffix(&candidate, extension);
            if target.exists() {
                if fs::metadata(&target)?.len() == data_len {
                    tracing::debug!("Identical file size, not saving {:?}", target);
                    return Ok(None);
                }
                if !options.save_images_overwrite {
                    candidate = next_filename(&base, counters);
                    continue;
                }
            }
            let data = content.blob.read()?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            tracing::debug!("Saving cover image {} to {:?}", self, target);
            fs::write(&target, data)?;
            return Ok(Some(target));
        }
    }

    fn stored(&self) -> Result<&StoredContent, CoverArtImageError> {
        self.content.as_ref().ok_or_else(|| no_data(self))
    }

    fn external_or_main(&self) -> Result<&StoredContent, CoverArtImageError> {
        self.external_file
            .as_ref()
            .or(self.content.as_ref())
            .ok_or_else(|| no_data(self))
    }

    /// Types as a set, for multi-type comparisons.
    fn type_set(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.types.iter().map(String::as_str).collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

fn no_data(image: &CoverArtImage) -> CoverArtImageError {
    CoverArtImageError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{image} has no data"),
    ))
}

/// `base`, then `base (1)`, `base (2)`, ... for repeated names.
fn next_filename(base: &Path, counters: &mut HashMap<PathBuf, u32>) -> PathBuf {
    let counter = counters.entry(base.to_path_buf()).or_insert(0);
    let name = if *counter > 0 {
        with_suffix(base, &format!(" ({counter})"))
    } else {
        base.to_path_buf()
    };
    *counter += 1;
    name
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

impl PartialEq for CoverArtImage {
    fn eq(&self, other: &Self) -> bool {
        match (self.content_hash(), other.content_hash()) {
            (None, None) => return true,
            (a, b) if a != b => return false,
            _ => {}
        }
        if self.support_types && other.support_types {
            if self.support_multi_types && other.support_multi_types {
                return self.type_set() == other.type_set();
            }
            return self.main_type() == other.main_type();
        }
        true
    }
}

impl Eq for CoverArtImage {}

impl Hash for CoverArtImage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.content_hash() {
            Some(hash) => hash.hash(state),
            None => 0u8.hash(state),
        }
    }
}

impl fmt::Display for CoverArtImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ImageKind::Url => "Image",
            ImageKind::Archive => "Archive image",
            ImageKind::ArchiveThumbnail => "Archive thumbnail",
            ImageKind::Tag { .. } => "Tag image",
            ImageKind::LocalFile => "Local image",
        };
        write!(f, "{kind}")?;
        if let Some(locator) = &self.locator {
            write!(f, " from {locator}")?;
        }
        if !self.types.is_empty() {
            write!(f, " of type {}", self.types.join(","))?;
        }
        if !self.comment.is_empty() {
            write!(f, " and comment '{}'", self.comment)?;
        }
        Ok(())
    }
}
