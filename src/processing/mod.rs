//! Filter and processing stage for downloaded images.
//!
//! - [`filters`]: accept/reject predicates ([`FilterChain`])
//! - [`processors`]: resize and format conversion per save target

pub mod filters;
pub mod processors;

pub use filters::{
    DontReplaceIncludedTypesFilter, DontReplaceWithSmallerFilter, FilterChain, FilterContext, ImageFilter, SizeFilter,
};
pub use processors::{
    ConvertProcessor, ImageProcessing, ImageProcessor, ProcessedImage, ProcessingError, ProcessingImage,
    ProcessingTarget, ResizeProcessor,
};
