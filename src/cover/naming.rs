//! Output file naming for cover images saved next to audio files.
//!
//! Templates use `{name}` placeholders filled from [`Metadata`], e.g.
//! `"{albumartist}/{album}/cover"` or `"{coverart_maintype}"`. Substituted
//! values are sanitized so they can never introduce path separators; the
//! template itself may contain them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::metadata::Metadata;

/// Used when a template expands to nothing.
pub const DEFAULT_COVER_IMAGE_FILENAME: &str = "cover";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("static regex"));

/// Expand `{name}` placeholders. Unknown names expand to an empty string.
pub fn expand_template(template: &str, metadata: &Metadata) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            sanitize_filename(&metadata.get_joined(&caps[1]).unwrap_or_default())
        })
        .into_owned()
}

/// Build the extension-less output path for an image.
///
/// Relative results are placed under `dirname`; absolute templates are
/// kept as they are.
pub fn image_filename(template: &str, dirname: &Path, metadata: &Metadata) -> PathBuf {
    let expanded = expand_template(template, metadata);
    let expanded = expanded.trim();
    let name = if expanded.is_empty() {
        DEFAULT_COVER_IMAGE_FILENAME
    } else {
        expanded
    };

    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dirname.join(path)
    }
}

/// Sanitizes a filename by removing/replacing invalid characters
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Generate an arbitrary string that might contain invalid characters
    fn arbitrary_value() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9 /:*?\"<>|_-]{1,50}").unwrap()
    }

    proptest! {
        /// Sanitized values should never contain path separators
        #[test]
        fn sanitize_removes_path_separators(input in arbitrary_value()) {
            let sanitized = sanitize_filename(&input);
            prop_assert!(!sanitized.contains('/'), "Found / in: {}", sanitized);
            prop_assert!(!sanitized.contains('\\'), "Found \\ in: {}", sanitized);
        }

        /// Sanitized length should be same as input length
        #[test]
        fn sanitize_preserves_length(input in arbitrary_value()) {
            let sanitized = sanitize_filename(&input);
            prop_assert_eq!(input.chars().count(), sanitized.chars().count());
        }

        /// Metadata values can't move the output outside the target directory
        #[test]
        fn expanded_names_stay_under_dir(album in arbitrary_value()) {
            let mut metadata = Metadata::default();
            metadata.set("album", album);
            let dir = PathBuf::from("/music/library");
            let path = image_filename("{album}", &dir, &metadata);
            prop_assert!(path.starts_with(&dir));
            prop_assert_eq!(path.parent(), Some(dir.as_path()));
        }
    }
}
