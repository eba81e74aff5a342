//! Image transforms applied before an image is stored.
//!
//! Images embedded in tags and images written to files are processed
//! separately since each target has its own limits. Both derivations start
//! from the same decoded image and run in parallel.

use std::io::Cursor;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::config::{ConvertFormat, ProcessingConfig, SavingConfig, TargetProcessing};
use crate::cover::{IdentificationError, ImageFormat, ImageInfo, identify};

/// Processing failures. The original bytes stay in use when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Processed image could not be identified: {0}")]
    Identification(#[from] IdentificationError),
}

/// Where a processed rendition ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingTarget {
    Tags,
    File,
}

/// A decoded image travelling through the processors of one target.
#[derive(Debug, Clone)]
pub struct ProcessingImage {
    pub image: DynamicImage,
    pub info: ImageInfo,
    /// Format the result is encoded in
    pub format: ImageFormat,
    modified: bool,
}

impl ProcessingImage {
    pub fn new(image: DynamicImage, info: ImageInfo) -> Self {
        Self {
            image,
            format: info.format,
            info,
            modified: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Encoded result, or `original` untouched if no processor changed anything.
    pub fn encode(&self, original: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        if !self.modified {
            return Ok(original.to_vec());
        }
        let (image, format) = match self.format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => (DynamicImage::ImageRgb8(self.image.to_rgb8()), image::ImageFormat::Jpeg),
            ImageFormat::Gif => (DynamicImage::ImageRgba8(self.image.to_rgba8()), image::ImageFormat::Gif),
            ImageFormat::Png | ImageFormat::Pdf => (self.image.clone(), image::ImageFormat::Png),
        };
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).map_err(ProcessingError::Encode)?;
        Ok(out.into_inner())
    }
}

pub trait ImageProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, image: &mut ProcessingImage);
}

/// Scales images down to fit the maximum bounds, keeping the aspect ratio.
/// Smaller images are left alone.
pub struct ResizeProcessor {
    pub max_width: u32,
    pub max_height: u32,
}

impl ResizeProcessor {
    /// Target dimensions for a `width` x `height` image, or `None` if it
    /// already fits.
    pub fn scaled_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 || (width <= self.max_width && height <= self.max_height) {
            return None;
        }
        let scale = f64::min(
            f64::from(self.max_width) / f64::from(width),
            f64::from(self.max_height) / f64::from(height),
        );
        let new_width = ((f64::from(width) * scale).round() as u32).max(1);
        let new_height = ((f64::from(height) * scale).round() as u32).max(1);
        Some((new_width, new_height))
    }
}

impl ImageProcessor for ResizeProcessor {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn run(&self, image: &mut ProcessingImage) {
        let (width, height) = (image.image.width(), image.image.height());
        let Some((new_width, new_height)) = self.scaled_size(width, height) else {
            return;
        };
        image.image = image.image.resize_exact(new_width, new_height, FilterType::Lanczos3);
        image.info.width = new_width;
        image.info.height = new_height;
        image.modified = true;
        tracing::debug!(
            target: "coverart",
            "Resized cover art from {}x{} to {}x{}",
            width,
            height,
            new_width,
            new_height
        );
    }
}

/// Re-encodes images in another format.
pub struct ConvertProcessor {
    pub format: ImageFormat,
}

impl ConvertProcessor {
    pub fn new(format: ConvertFormat) -> Self {
        let format = match format {
            ConvertFormat::Jpeg => ImageFormat::Jpeg,
            ConvertFormat::Png => ImageFormat::Png,
            ConvertFormat::Gif => ImageFormat::Gif,
        };
        Self { format }
    }
}

impl ImageProcessor for ConvertProcessor {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn run(&self, image: &mut ProcessingImage) {
        if image.format == self.format {
            return;
        }
        tracing::debug!(
            target: "coverart",
            "Changed cover art format from {} to {}",
            image.format.mime_type(),
            self.format.mime_type()
        );
        image.format = self.format;
        image.info.format = self.format;
        image.modified = true;
    }
}

/// Renditions produced for one downloaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Data stored on the image itself and embedded in tags
    pub tags: Vec<u8>,
    /// Separate rendition for files; `None` when it equals `tags`
    pub file: Option<Vec<u8>>,
}

impl ProcessedImage {
    fn unchanged(data: &[u8]) -> Self {
        Self {
            tags: data.to_vec(),
            file: None,
        }
    }
}

/// Processor queues for both targets.
#[derive(Default)]
pub struct ImageProcessing {
    tags: Vec<Box<dyn ImageProcessor>>,
    file: Vec<Box<dyn ImageProcessor>>,
}

impl ImageProcessing {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            tags: processors_for(&config.tags),
            file: processors_for(&config.file),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.file.is_empty()
    }

    fn queue(&self, target: ProcessingTarget) -> &[Box<dyn ImageProcessor>] {
        match target {
            ProcessingTarget::Tags => &self.tags,
            ProcessingTarget::File => &self.file,
        }
    }

    /// Derive the tag and file renditions of `data`.
    ///
    /// Targets that are not saved to keep the original bytes. Non-raster
    /// images (PDF) pass through untouched.
    pub fn run(&self, data: &[u8], info: &ImageInfo, saving: &SavingConfig) -> Result<ProcessedImage, ProcessingError> {
        if self.is_empty() || !info.format.is_raster() {
            return Ok(ProcessedImage::unchanged(data));
        }

        let decoded = image::load_from_memory(data).map_err(ProcessingError::Decode)?;
        let source = ProcessingImage::new(decoded, *info);

        let run_target = |target: ProcessingTarget, wanted: bool| -> Result<Vec<u8>, ProcessingError> {
            if !wanted {
                return Ok(data.to_vec());
            }
            self.run_queue(source.clone(), target, data)
        };

        let (tags, file) = rayon::join(
            || run_target(ProcessingTarget::Tags, saving.save_images_to_tags),
            || run_target(ProcessingTarget::File, saving.save_images_to_files),
        );
        let tags = tags?;
        let file = file?;

        let file = if saving.save_images_to_files && file != tags {
            Some(file)
        } else {
            None
        };
        Ok(ProcessedImage { tags, file })
    }

    fn run_queue(&self, mut image: ProcessingImage, target: ProcessingTarget, original: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        for processor in self.queue(target) {
            processor.run(&mut image);
        }
        let encoded = image.encode(original)?;
        if image.is_modified() {
            let result = identify(&encoded)?;
            tracing::debug!(target: "coverart", ?target, info = %result, "Processed cover art");
        }
        Ok(encoded)
    }
}

fn processors_for(config: &TargetProcessing) -> Vec<Box<dyn ImageProcessor>> {
    let mut queue: Vec<Box<dyn ImageProcessor>> = Vec::new();
    if config.resize {
        queue.push(Box::new(ResizeProcessor {
            max_width: config.max_width,
            max_height: config.max_height,
        }));
    }
    if config.convert {
        queue.push(Box::new(ConvertProcessor::new(config.convert_to)));
    }
    queue
}
