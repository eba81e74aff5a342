//! Image identification by header sniffing.
//!
//! Reports dimensions, MIME type and extension for GIF, PNG, JPEG and PDF
//! payloads without decoding pixel data. This is a pure function over the
//! provided bytes: no I/O, no allocation beyond the returned value.

use std::fmt;

/// Inputs shorter than this are rejected before any format check.
const MIN_DATA_LEN: usize = 16;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Formats recognised by [`identify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Gif,
    Png,
    Jpeg,
    Pdf,
}

impl ImageFormat {
    /// MIME type (image/jpeg, application/pdf, ...)
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => ".gif",
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Pdf => ".pdf",
        }
    }

    /// Whether the format carries pixel data we can decode and transform.
    pub fn is_raster(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// What [`identify`] learned about a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data_len: usize,
}

impl ImageInfo {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "w={} h={} mime={} ext={} datalen={}",
            self.width,
            self.height,
            self.mime_type(),
            self.extension(),
            self.data_len
        )
    }
}

/// Errors from [`identify`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentificationError {
    #[error("Not enough data")]
    NotEnoughData,

    #[error("Unrecognized image data")]
    UnrecognizedFormat,

    #[error("Unexpected error: recognized {0} data could not be fully parsed")]
    UnexpectedError(&'static str),
}

/// Identify an image from its raw bytes.
pub fn identify(data: &[u8]) -> Result<ImageInfo, IdentificationError> {
    if data.len() < MIN_DATA_LEN {
        return Err(IdentificationError::NotEnoughData);
    }

    let (format, dimensions) = if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        let width = u16::from_le_bytes([data[6], data[7]]);
        let height = u16::from_le_bytes([data[8], data[9]]);
        (ImageFormat::Gif, Some((width as u32, height as u32)))
    } else if data.starts_with(PNG_SIGNATURE) && &data[12..16] == b"IHDR" {
        (ImageFormat::Png, png_dimensions(data))
    } else if data.starts_with(&[0xFF, 0xD8]) {
        (ImageFormat::Jpeg, jpeg_dimensions(data))
    } else if data.starts_with(b"%PDF") {
        (ImageFormat::Pdf, Some((0, 0)))
    } else {
        return Err(IdentificationError::UnrecognizedFormat);
    };

    // The format was recognised but the header was cut short
    let (width, height) =
        dimensions.ok_or(IdentificationError::UnexpectedError(format.mime_type()))?;

    Ok(ImageInfo {
        width,
        height,
        format,
        data_len: data.len(),
    })
}

fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let width = read_u32_be(data, 16)?;
    let height = read_u32_be(data, 20)?;
    Some((width, height))
}

/// Walk JPEG marker segments from SOI until a baseline/progressive SOF marker.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2;
    let mut byte = *data.get(pos)?;
    pos += 1;

    // 0xDA is start-of-scan: no frame header can follow
    while byte != 0xDA {
        while byte != 0xFF {
            byte = *data.get(pos)?;
            pos += 1;
        }
        while byte == 0xFF {
            byte = *data.get(pos)?;
            pos += 1;
        }

        if (0xC0..=0xC3).contains(&byte) {
            // Segment length (2) and sample precision (1) precede the dimensions
            let height = read_u16_be(data, pos + 3)?;
            let width = read_u16_be(data, pos + 5)?;
            return Some((width as u32, height as u32));
        }

        let segment_len = read_u16_be(data, pos)? as usize;
        pos += segment_len.max(2);
        byte = *data.get(pos)?;
        pos += 1;
    }

    None
}

fn read_u16_be(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32_be(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use crate::test_utils::{fake_gif, fake_jpeg, fake_png};
    use proptest::prelude::*;

    proptest! {
        /// Short inputs are always rejected, whatever they contain
        #[test]
        fn short_input_is_not_enough_data(data in prop::collection::vec(any::<u8>(), 0..16)) {
            prop_assert_eq!(identify(&data), Err(IdentificationError::NotEnoughData));
        }

        /// Arbitrary bytes never panic the parser
        #[test]
        fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = identify(&data);
        }

        /// Arbitrary bytes after a JPEG SOI never panic the segment walker
        #[test]
        fn arbitrary_jpeg_segments_never_panic(tail in prop::collection::vec(any::<u8>(), 14..256)) {
            let mut data = vec![0xFF, 0xD8];
            data.extend(tail);
            let _ = identify(&data);
        }

        /// Encoded dimensions come back unchanged
        #[test]
        fn reports_encoded_dimensions(width in 1u16..u16::MAX, height in 1u16..u16::MAX) {
            let (w, h) = (width as u32, height as u32);
            for data in [fake_gif(w, h), fake_png(w, h), fake_jpeg(w, h)] {
                let info = identify(&data).unwrap();
                prop_assert_eq!((info.width, info.height), (w, h));
            }
        }
    }
}
