//! Release/track metadata as seen by the cover art pipeline.
//!
//! A multi-valued tag map plus the image collection that accepted cover art
//! ends up in. Tag names follow the lowercase MusicBrainz-style names used in
//! filename templates (`album`, `albumartist`, `musicbrainz_albumid`, ...).

use std::collections::BTreeMap;

use crate::cover::ImageList;

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    tags: BTreeMap<String, Vec<String>>,
    pub images: ImageList,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(name.into(), vec![value.into()]);
    }

    /// Append a value to `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(name.into()).or_default().push(value.into());
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// All values of `name` joined with "; ", as used in filename templates.
    pub fn get_joined(&self, name: &str) -> Option<String> {
        let values = self.tags.get(name)?;
        if values.is_empty() {
            return None;
        }
        Some(values.join("; "))
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.tags.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_values() {
        let mut metadata = Metadata::new();
        metadata.add("artist", "A");
        metadata.add("artist", "B");
        assert_eq!(metadata.get_all("artist"), ["A", "B"]);

        metadata.set("artist", "C");
        assert_eq!(metadata.get_all("artist"), ["C"]);
    }

    #[test]
    fn test_get_joined() {
        let mut metadata = Metadata::new();
        assert_eq!(metadata.get_joined("genre"), None);

        metadata.add("genre", "Rock");
        metadata.add("genre", "Blues");
        assert_eq!(metadata.get("genre"), Some("Rock"));
        assert_eq!(metadata.get_joined("genre").as_deref(), Some("Rock; Blues"));
    }

    #[test]
    fn test_missing_tag_is_empty() {
        let metadata = Metadata::new();
        assert!(metadata.get_all("album").is_empty());
        assert!(!metadata.contains("album"));
    }
}
