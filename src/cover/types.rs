//! Cover art type vocabulary.
//!
//! Type names follow the Cover Art Archive vocabulary, lowercased. Images
//! may carry several types at once (e.g. `front` + `booklet`).

use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;

/// Ordered list of type names attached to an image. Almost always 0-2 entries.
pub type ImageTypes = SmallVec<[String; 2]>;

pub const FRONT: &str = "front";

/// Pseudo type for archive entries that carry no type at all.
pub const UNKNOWN: &str = "unknown";

/// Known type names.
pub const CAA_TYPES: &[&str] = &[
    "front",
    "back",
    "booklet",
    "medium",
    "tray",
    "obi",
    "spine",
    "track",
    "liner",
    "sticker",
    "poster",
    "watermark",
    "raw/unedited",
    "matrix/runout",
    "top",
    "bottom",
    "other",
];

static TOKEN_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9/]+").expect("static regex"));

/// Derive types from free text (usually the tail of a file name).
///
/// The text is lowercased and split on anything that isn't a letter, digit
/// or slash; every token naming a known type is kept, in vocabulary order.
/// Falls back to `front` when nothing is recognised.
pub fn types_from_text(text: &str) -> ImageTypes {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_SPLIT.split(&lowered).filter(|t| !t.is_empty()).collect();

    let found: ImageTypes = CAA_TYPES
        .iter()
        .filter(|name| tokens.contains(*name))
        .map(|name| name.to_string())
        .collect();

    if found.is_empty() {
        smallvec::smallvec![FRONT.to_string()]
    } else {
        found
    }
}

/// Lowercase a list of type names as received from a provider.
pub fn lowercase_types<I, S>(types: I) -> ImageTypes
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    types.into_iter().map(|t| t.as_ref().to_lowercase()).collect()
}

/// Whether two type lists share at least one name.
pub fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|t| b.contains(t))
}
