//! Test utilities and fixtures for cover-minder tests.
//!
//! Provides minimal image byte sequences (header-only fakes and real
//! encoded images), a release JSON fixture and content-store helpers to
//! reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use cover_minder::test_utils::{fake_png, padded};
//!
//! let data = padded(fake_png(500, 500), 2048);
//! let info = identify(&data)?;
//! ```

use std::io::Cursor;

use tempfile::TempDir;

use crate::cover::ContentStore;

/// Header-only GIF with the given dimensions.
pub fn fake_gif(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&(width as u16).to_le_bytes());
    data.extend_from_slice(&(height as u16).to_le_bytes());
    data.extend_from_slice(&[0xF7, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    data
}

/// Header-only PNG (signature + IHDR chunk) with the given dimensions.
pub fn fake_png(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[0x08, 0x06, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    data
}

/// Header-only JPEG: SOI, a JFIF APP0 segment, then an SOF0 frame header.
pub fn fake_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    // APP0, length 16
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    // SOF0, length 17, precision 8
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&(height as u16).to_be_bytes());
    data.extend_from_slice(&(width as u16).to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    data
}

/// Pad `data` with zero bytes up to `len` (identify only looks at headers).
pub fn padded(mut data: Vec<u8>, len: usize) -> Vec<u8> {
    if data.len() < len {
        data.resize(len, 0);
    }
    data
}

/// A real, decodable image of the given size encoded in `format`.
pub fn encoded_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, format)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// A content store rooted in a fresh temporary directory.
///
/// Keep the TempDir alive for the duration of your test.
pub fn temp_store() -> (ContentStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store = ContentStore::in_dir(dir.path());
    (store, dir)
}

/// MusicBrainz release JSON with cover art archive info and URL relationships.
pub fn release_json(release_id: &str) -> String {
    format!(
        r#"{{
            "id": "{release_id}",
            "title": "Test Album",
            "release-group": {{ "id": "rg-{release_id}", "title": "Test Album" }},
            "cover-art-archive": {{
                "artwork": true, "count": 2, "front": true, "back": true, "darkened": false
            }},
            "artist-credit": [{{ "name": "Test Artist", "artist": {{ "id": "a1", "name": "Test Artist" }} }}],
            "relations": [
                {{
                    "type": "cover art link",
                    "target-type": "url",
                    "url": {{ "resource": "http://images.example.com/whitelisted.jpg" }}
                }},
                {{
                    "type": "amazon asin",
                    "target-type": "url",
                    "url": {{ "resource": "https://www.amazon.de/gp/product/B000002UB2" }}
                }},
                {{
                    "type": "purchase for download",
                    "target-type": "url",
                    "url": {{ "resource": "http://www.cdbaby.com/cd/bandname" }}
                }}
            ]
        }}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::musicbrainz::Release;

    #[test]
    fn test_fake_images_are_at_least_sixteen_bytes() {
        assert!(fake_gif(1, 1).len() >= 16);
        assert!(fake_png(1, 1).len() >= 16);
        assert!(fake_jpeg(1, 1).len() >= 16);
    }

    #[test]
    fn test_padded() {
        assert_eq!(padded(vec![1, 2], 4), vec![1, 2, 0, 0]);
        assert_eq!(padded(vec![1, 2, 3], 2), vec![1, 2, 3]);
    }

    #[test]
    fn test_release_fixture_parses() {
        let release: Release = serde_json::from_str(&release_json("r1")).unwrap();
        assert_eq!(release.id, "r1");
        assert_eq!(release.relations.len(), 3);
    }
}
