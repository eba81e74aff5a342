//! Cover art retrieval session - drives the provider chain for one release
//!
//! A session:
//! 1. Asks each provider, in priority order, for candidates
//! 2. Downloads (or reads) the queued candidates one at a time, FIFO
//! 3. Identifies, filters and processes each payload
//! 4. Hands accepted images to the owner and finalizes it once
//!
//! Only one download is in flight per session. Once a front image is found
//! and a single embedded front image is all that is wanted, the session
//! stops early. Network and identification failures are reported to the
//! owner and skipped; a broken temp store aborts the session.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use url::Url;

use crate::album::CoverArtOwner;
use crate::config::Config;
use crate::cover::{ContentStore, CoverArtImage, CoverArtImageError, ImageInfo, ImageList, identify};
use crate::error::{Error, Result};
use crate::processing::{FilterChain, FilterContext, ImageProcessing, ProcessedImage};
use crate::providers::{CoverArtProvider, ProviderContext, QueueOutcome};
use crate::transport::{DownloadRequest, DownloadTransport};

/// Downloads smaller than this are assumed to be error pages.
pub const MIN_IMAGE_BYTES: usize = 1000;

/// Where a session is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting on a provider or a download
    Retrieving,
    /// Choosing the next provider or candidate
    Advancing,
    /// Notifying the owner
    Finalizing,
    Done,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Saving images is switched off; nothing was fetched
    Disabled,
    /// Queue and providers exhausted
    Completed,
    /// A front image was found and nothing more is needed
    EarlyExit,
    /// The temp store failed
    Aborted,
    /// The owner left the working set mid-session; it was not finalized
    Abandoned,
}

/// What to do after handling one candidate.
enum Step {
    Next,
    Stop(SessionOutcome),
}

/// One cover art retrieval run for a release.
pub struct CoverArtSession {
    config: Config,
    transport: Arc<dyn DownloadTransport>,
    store: ContentStore,
    owner: Arc<dyn CoverArtOwner>,
    providers: VecDeque<Box<dyn CoverArtProvider>>,
    queue: VecDeque<CoverArtImage>,
    filters: FilterChain,
    processing: Arc<ImageProcessing>,
    original_images: ImageList,
    /// Stored raster stand-ins, by URL, waiting for the image they belong to
    thumbnails: HashMap<Url, Arc<CoverArtImage>>,
    front_image_found: bool,
    state: SessionState,
}

impl CoverArtSession {
    pub fn new(
        config: Config,
        transport: Arc<dyn DownloadTransport>,
        store: ContentStore,
        owner: Arc<dyn CoverArtOwner>,
        providers: Vec<Box<dyn CoverArtProvider>>,
    ) -> Self {
        let filters = FilterChain::from_config(&config);
        let processing = Arc::new(ImageProcessing::from_config(&config.processing));
        let original_images = owner.original_images();
        Self {
            config,
            transport,
            store,
            owner,
            providers: providers.into(),
            queue: VecDeque::new(),
            filters,
            processing,
            original_images,
            thumbnails: HashMap::new(),
            front_image_found: false,
            state: SessionState::Retrieving,
        }
    }

    /// Replace the filters built from the config.
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn front_image_found(&self) -> bool {
        self.front_image_found
    }

    /// Run the session to the end.
    ///
    /// The owner is finalized exactly once unless it was removed from the
    /// working set. A provider failing while queueing is a bug in that
    /// provider: the owner is finalized with an error and the failure is
    /// returned.
    pub async fn retrieve(&mut self) -> Result<SessionOutcome> {
        if !self.config.saving.enabled() {
            tracing::debug!(target: "coverart", "Cover art disabled by user options");
            return Ok(self.finish(SessionOutcome::Disabled, false));
        }

        loop {
            self.state = SessionState::Advancing;

            if !self.owner.is_tracked() {
                tracing::debug!(target: "coverart", "Owner removed, abandoning cover art retrieval");
                self.state = SessionState::Done;
                return Ok(SessionOutcome::Abandoned);
            }

            if self.early_exit_reached() {
                tracing::debug!(target: "coverart", "Front image found, not trying further sources");
                return Ok(self.finish(SessionOutcome::EarlyExit, false));
            }

            let Some(image) = self.queue.pop_front() else {
                let Some(provider) = self.providers.pop_front() else {
                    return Ok(self.finish(SessionOutcome::Completed, false));
                };
                self.run_provider(provider.as_ref()).await?;
                continue;
            };

            if let Step::Stop(outcome) = self.handle_candidate(image).await {
                return Ok(outcome);
            }
        }
    }

    fn early_exit_reached(&self) -> bool {
        let saving = &self.config.saving;
        self.front_image_found
            && saving.save_images_to_tags
            && !saving.save_images_to_files
            && saving.embed_only_one_front_image
    }

    fn finish(&mut self, outcome: SessionOutcome, error: bool) -> SessionOutcome {
        self.state = SessionState::Finalizing;
        self.queue.clear();
        self.providers.clear();
        self.owner.finalize_loading(error);
        self.state = SessionState::Done;
        outcome
    }

    async fn run_provider(&mut self, provider: &dyn CoverArtProvider) -> Result<()> {
        let owner = Arc::clone(&self.owner);
        let metadata = owner.metadata();
        let files = owner.files();
        let ctx = ProviderContext {
            release: owner.release(),
            metadata: &metadata,
            files: &files,
            config: &self.config,
            front_image_found: self.front_image_found,
        };

        if !provider.enabled(&ctx) {
            tracing::debug!(target: "coverart", provider = provider.name(), "Skipping cover art provider");
            return Ok(());
        }
        tracing::debug!(target: "coverart", provider = provider.name(), "Trying cover art provider");

        let outcome = match provider.queue_images(&ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(target: "coverart", provider = provider.name(), "Provider failed: {}", e);
                self.finish(SessionOutcome::Aborted, true);
                return Err(Error::Provider(e).context(format!("cover art provider {}", provider.name())));
            }
        };

        let images = match outcome {
            QueueOutcome::Finished(images) => images,
            QueueOutcome::Wait(pending) => {
                self.state = SessionState::Retrieving;
                match pending.await {
                    Ok(images) => images,
                    Err(e) => {
                        self.owner.error_append(format!("{} error: {}", provider.name(), e));
                        Vec::new()
                    }
                }
            }
        };

        tracing::debug!(
            target: "coverart",
            provider = provider.name(),
            count = images.len(),
            "Queued cover art candidates"
        );
        self.queue.extend(images);
        Ok(())
    }

    async fn handle_candidate(&mut self, image: CoverArtImage) -> Step {
        if !image.support_types() && self.front_image_found {
            tracing::debug!(target: "coverart", image = %image, "Skipping, a front image is already available");
            return Step::Next;
        }

        if let Some(path) = image.local_path() {
            return match tokio::fs::read(&path).await {
                Ok(data) => self.set_metadata(image, data).await,
                Err(e) => {
                    tracing::error!(target: "coverart", path = ?path, "Failed to read cover art: {}", e);
                    Step::Next
                }
            };
        }

        let Some(url) = image.url() else {
            tracing::warn!(target: "coverart", image = %image, "Candidate has no source, skipping");
            return Step::Next;
        };
        let request = match DownloadRequest::from_url(url) {
            Ok(request) => request.with_priority(true).with_important(false),
            Err(e) => {
                self.owner.error_append(format!("Coverart error: {}", e));
                return Step::Next;
            }
        };

        tracing::debug!(
            target: "coverart",
            url = %request,
            types = %image.types_as_string(),
            "Downloading cover art"
        );
        self.state = SessionState::Retrieving;
        let result = self.transport.download(&request).await;

        if !self.owner.is_tracked() {
            self.state = SessionState::Done;
            return Step::Stop(SessionOutcome::Abandoned);
        }

        match result {
            Err(e) => {
                self.owner.error_append(format!("Coverart error: {}", e));
                Step::Next
            }
            Ok(data) if data.len() < MIN_IMAGE_BYTES => {
                tracing::warn!(
                    target: "coverart",
                    url = %request,
                    len = data.len(),
                    "Not enough data, skipping"
                );
                Step::Next
            }
            Ok(data) => self.set_metadata(image, data).await,
        }
    }

    /// Identify, filter, process and store one payload, then hand the image
    /// to the owner (or keep it as a thumbnail).
    async fn set_metadata(&mut self, mut image: CoverArtImage, data: Vec<u8>) -> Step {
        let info = match identify(&data) {
            Ok(info) => info,
            Err(e) => {
                self.owner.error_append(CoverArtImageError::from(e).to_string());
                return Step::Next;
            }
        };

        let processable = image.can_be_saved_to_metadata();
        if processable {
            let ctx = FilterContext {
                original_images: &self.original_images,
            };
            if !self.filters.run(&data, &info, &image, &ctx) {
                return Step::Next;
            }
        }

        let processed = if processable {
            self.process(&data, &info).await
        } else {
            ProcessedImage { tags: data, file: None }
        };

        if let Err(e) = image.set_data(&self.store, &processed.tags) {
            return self.storage_error(e);
        }
        if let Some(file) = &processed.file
            && let Err(e) = image.set_external_file_data(&self.store, file)
        {
            return self.storage_error(e);
        }

        if processable {
            let thumbnail = image
                .thumbnail_url()
                .and_then(|url| self.thumbnails.get(url))
                .cloned();
            if let Some(thumbnail) = thumbnail {
                image.set_thumbnail(thumbnail);
            }

            tracing::debug!(
                target: "coverart",
                image = %image,
                info = %image.imageinfo_as_string(),
                "Cover art image stored to metadata"
            );
            let is_front = image.is_front_image();
            self.owner.append_image(Arc::new(image));
            if !self.front_image_found {
                self.front_image_found = is_front;
            }
        } else {
            tracing::debug!(
                target: "coverart",
                image = %image,
                info = %image.imageinfo_as_string(),
                "Thumbnail for cover art image"
            );
            if let Some(url) = image.url().cloned() {
                self.thumbnails.insert(url, Arc::new(image));
            }
        }

        Step::Next
    }

    /// Tag and file renditions of `data`. On failure the original bytes are
    /// used for both and the error is reported.
    async fn process(&self, data: &[u8], info: &ImageInfo) -> ProcessedImage {
        let unchanged = || ProcessedImage {
            tags: data.to_vec(),
            file: None,
        };
        if self.processing.is_empty() {
            return unchanged();
        }

        let processing = Arc::clone(&self.processing);
        let saving = self.config.saving.clone();
        let owned = data.to_vec();
        let info = *info;

        match tokio::task::spawn_blocking(move || processing.run(&owned, &info, &saving)).await {
            Ok(Ok(processed)) => processed,
            Ok(Err(e)) => {
                self.owner.error_append(e.to_string());
                unchanged()
            }
            Err(e) => {
                tracing::error!(target: "coverart", "Image processing task failed: {}", e);
                unchanged()
            }
        }
    }

    fn storage_error(&mut self, error: CoverArtImageError) -> Step {
        match error {
            CoverArtImageError::Io(_) => {
                tracing::error!(target: "coverart", "Cannot store cover art, aborting: {}", error);
                self.owner.error_append(error.to_string());
                Step::Stop(self.finish(SessionOutcome::Aborted, true))
            }
            CoverArtImageError::Identification(_) => {
                self.owner.error_append(error.to_string());
                Step::Next
            }
        }
    }
}
