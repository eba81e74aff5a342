//! Read pictures embedded in audio file tags.
//!
//! Uses lofty to read picture data from:
//! - ID3v2 tags (MP3)
//! - Vorbis comments (FLAC, OGG)
//! - MP4 atoms (M4A/AAC)
//! - APEv2 tags
//!
//! Whether a picture carries a usable type depends on the tag format: ID3v2
//! and Vorbis pictures have a picture type, MP4 and APE pictures do not.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::probe::Probe;
use lofty::tag::TagType;
use smallvec::smallvec;

use super::image::{CoverArtImage, CoverArtImageError};
use super::store::ContentStore;
use super::types::ImageTypes;
use crate::error::Result;

/// All pictures from all tags of `path`, as tag-sourced images.
///
/// Pictures whose data can't be identified (e.g. BMP) are skipped.
pub fn read_tag_images(path: &Path, store: &ContentStore) -> Result<Vec<CoverArtImage>> {
    let tagged_file = Probe::open(path)?.read()?;

    let mut images = Vec::new();
    for tag in tagged_file.tags() {
        let tag_type = tag.tag_type();
        let support_types = supports_types(tag_type);

        for picture in tag.pictures() {
            let types = if support_types {
                picture_types(picture.pic_type())
            } else {
                ImageTypes::new()
            };
            let image = CoverArtImage::from_tag(path, Some(tag_name(tag_type).to_string()), support_types, false)
                .with_types(types)
                .with_comment(picture.description().unwrap_or_default());

            match image.with_data(store, picture.data()) {
                Ok(image) => images.push(image),
                Err(CoverArtImageError::Identification(e)) => {
                    tracing::warn!("Skipping picture in {:?}: {}", path, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::debug!("Read {} tag images from {:?}", images.len(), path);
    Ok(images)
}

/// Tag formats whose pictures carry a picture type.
pub fn supports_types(tag_type: TagType) -> bool {
    matches!(tag_type, TagType::Id3v2 | TagType::VorbisComments)
}

/// Map an ID3-style picture type to cover art types.
pub fn picture_types(pic_type: PictureType) -> ImageTypes {
    let name = match pic_type {
        PictureType::CoverFront => "front",
        PictureType::CoverBack => "back",
        PictureType::Leaflet => "booklet",
        PictureType::Media => "medium",
        _ => "other",
    };
    smallvec![name.to_string()]
}

fn tag_name(tag_type: TagType) -> &'static str {
    match tag_type {
        TagType::Id3v2 => "ID3v2",
        TagType::VorbisComments => "Vorbis",
        TagType::Mp4Ilst => "MP4",
        TagType::Ape => "APEv2",
        _ => "Tag",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_store;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_from_nonexistent_file() {
        let (store, _dir) = temp_store();
        assert!(read_tag_images(Path::new("nonexistent.mp3"), &store).is_err());
    }

    #[test]
    fn test_read_from_non_audio_file() {
        let (store, _dir) = temp_store();
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "Not an audio file").expect("Failed to write");

        assert!(read_tag_images(file.path(), &store).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_supports_types() {
        assert!(supports_types(TagType::Id3v2));
        assert!(supports_types(TagType::VorbisComments));
        assert!(!supports_types(TagType::Mp4Ilst));
        assert!(!supports_types(TagType::Ape));
    }

    #[test]
    fn test_picture_types() {
        assert_eq!(picture_types(PictureType::CoverFront).as_slice(), ["front"]);
        assert_eq!(picture_types(PictureType::CoverBack).as_slice(), ["back"]);
        assert_eq!(picture_types(PictureType::Leaflet).as_slice(), ["booklet"]);
        assert_eq!(picture_types(PictureType::Media).as_slice(), ["medium"]);
        assert_eq!(picture_types(PictureType::Artist).as_slice(), ["other"]);
    }
}
