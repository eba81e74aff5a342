//! The aggregate cover art is retrieved for.
//!
//! A retrieval session only talks to its owner through [`CoverArtOwner`]:
//! it reads the release and files, reports errors, hands over accepted
//! images and signals completion exactly once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::cover::{ContentStore, CoverArtImage, ImageList, embedded};
use crate::metadata::Metadata;
use crate::musicbrainz::{self, Release};

/// Owner of a cover art retrieval session.
pub trait CoverArtOwner: Send + Sync {
    /// Whether the owner is still part of the working set. A session that
    /// finds this false after resuming stops without reporting anything.
    fn is_tracked(&self) -> bool;

    /// The release being processed.
    fn release(&self) -> &Release;

    /// Snapshot of the new metadata.
    fn metadata(&self) -> Metadata;

    /// Audio files belonging to the release.
    fn files(&self) -> Vec<PathBuf>;

    /// Images already present in the files' tags.
    fn original_images(&self) -> ImageList;

    /// Record a recoverable error.
    fn error_append(&self, message: String);

    /// Accept an image into the new metadata.
    fn append_image(&self, image: Arc<CoverArtImage>);

    /// Retrieval is over. Called once per session.
    fn finalize_loading(&self, error: bool);
}

/// Completion state of an [`Album`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed,
}

/// A release with its files, original (tag) metadata and new metadata.
#[derive(Debug)]
pub struct Album {
    release: Release,
    files: Vec<PathBuf>,
    orig_metadata: Metadata,
    metadata: Mutex<Metadata>,
    errors: Mutex<Vec<String>>,
    tracked: AtomicBool,
    state: Mutex<LoadState>,
    finalize_calls: Mutex<usize>,
}

impl Album {
    pub fn new(release: Release, files: Vec<PathBuf>) -> Self {
        let metadata = musicbrainz::to_metadata(&release);
        Self {
            release,
            files,
            orig_metadata: Metadata::new(),
            metadata: Mutex::new(metadata),
            errors: Mutex::new(Vec::new()),
            tracked: AtomicBool::new(true),
            state: Mutex::new(LoadState::Loading),
            finalize_calls: Mutex::new(0),
        }
    }

    /// Read the pictures already embedded in the files into the original
    /// metadata. Unreadable files are logged and skipped.
    pub fn load_original_images(&mut self, store: &ContentStore) {
        for file in &self.files {
            match embedded::read_tag_images(file, store) {
                Ok(images) => {
                    for image in images {
                        self.orig_metadata.images.append(Arc::new(image));
                    }
                }
                Err(e) => tracing::warn!("Could not read tag images from {:?}: {}", file, e),
            }
        }
    }

    /// Seed the original metadata directly.
    pub fn with_original_metadata(mut self, orig_metadata: Metadata) -> Self {
        self.orig_metadata = orig_metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.release.id
    }

    pub fn orig_metadata(&self) -> &Metadata {
        &self.orig_metadata
    }

    /// Images accepted so far.
    pub fn images(&self) -> ImageList {
        self.metadata.lock().images.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Take the album out of the working set.
    pub fn remove(&self) {
        self.tracked.store(false, Ordering::Release);
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock()
    }

    /// How often `finalize_loading` ran.
    pub fn finalize_count(&self) -> usize {
        *self.finalize_calls.lock()
    }
}

impl CoverArtOwner for Album {
    fn is_tracked(&self) -> bool {
        self.tracked.load(Ordering::Acquire)
    }

    fn release(&self) -> &Release {
        &self.release
    }

    fn metadata(&self) -> Metadata {
        self.metadata.lock().clone()
    }

    fn files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn original_images(&self) -> ImageList {
        self.orig_metadata.images.clone()
    }

    fn error_append(&self, message: String) {
        tracing::error!(album = %self.release.id, "{}", message);
        self.errors.lock().push(message);
    }

    fn append_image(&self, image: Arc<CoverArtImage>) {
        self.metadata.lock().images.append(image);
    }

    fn finalize_loading(&self, error: bool) {
        *self.finalize_calls.lock() += 1;
        *self.state.lock() = if error {
            LoadState::Failed
        } else {
            LoadState::Loaded
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fake_png, release_json, temp_store};

    fn album() -> Album {
        let release: Release = serde_json::from_str(&release_json("r1")).unwrap();
        Album::new(release, vec![PathBuf::from("/music/a/01.flac")])
    }

    #[test]
    fn test_new_album_metadata() {
        let album = album();
        assert_eq!(album.id(), "r1");
        assert_eq!(album.metadata().get("album"), Some("Test Album"));
        assert_eq!(album.state(), LoadState::Loading);
        assert!(album.is_tracked());
    }

    #[test]
    fn test_append_image_and_errors() {
        let (store, _dir) = temp_store();
        let album = album();
        let image = Arc::new(CoverArtImage::unlocated().with_data(&store, &fake_png(1, 1)).unwrap());

        album.append_image(image);
        album.error_append("Coverart error: boom".to_string());

        assert_eq!(album.images().len(), 1);
        assert_eq!(album.errors(), vec!["Coverart error: boom"]);
    }

    #[test]
    fn test_finalize_and_remove() {
        let album = album();
        album.finalize_loading(true);
        assert_eq!(album.state(), LoadState::Failed);
        assert_eq!(album.finalize_count(), 1);

        album.remove();
        assert!(!album.is_tracked());
    }

    #[test]
    fn test_load_original_images_skips_unreadable_files() {
        let (store, _dir) = temp_store();
        let mut album = album();
        album.load_original_images(&store);
        assert!(album.original_images().is_empty());
    }
}
