//! Cover art images and their storage.
//!
//! - [`imageinfo`]: header sniffing for GIF/PNG/JPEG/PDF
//! - [`store`]: content-addressed temp storage shared by all images
//! - [`image`]: the [`CoverArtImage`] candidate model
//! - [`collection`]: the de-duplicating [`ImageList`]
//! - [`types`]: type vocabulary
//! - [`naming`]: output file names
//! - [`embedded`]: pictures already present in audio file tags

pub mod collection;
pub mod embedded;
pub mod image;
pub mod imageinfo;
pub mod naming;
pub mod store;
pub mod types;

pub use collection::ImageList;
pub use image::{Capabilities, CoverArtImage, CoverArtImageError, ImageKind, Locator};
pub use imageinfo::{IdentificationError, ImageFormat, ImageInfo, identify};
pub use store::{BlobHandle, ContentStore};
pub use types::ImageTypes;
