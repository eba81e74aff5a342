//! Cover images lying next to the audio files.
//!
//! Every distinct directory holding one of the release's files is walked
//! once; file names matching the configured pattern become candidates. The
//! pattern's first capture group, when present, is scanned for type names.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use walkdir::WalkDir;

use super::{CoverArtProvider, ProviderContext, ProviderError, ProviderId, QueueOutcome};
use crate::cover::types::types_from_text;
use crate::cover::CoverArtImage;

pub struct LocalProvider {
    pattern: Regex,
}

impl LocalProvider {
    /// Compile the file name pattern, case-insensitively.
    pub fn new(cover_regex: &str) -> Result<Self, ProviderError> {
        let pattern = RegexBuilder::new(cover_regex).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    /// Candidates found below `dir`, in file name order.
    pub fn find_local_images(&self, dir: &Path) -> Vec<CoverArtImage> {
        let mut images = Vec::new();

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(filename) = entry.file_name().to_str() else {
                continue;
            };
            let Some(captures) = self.pattern.captures(filename) else {
                continue;
            };

            // Without a type group every match counts as a front cover
            let types = types_from_text(captures.get(1).map_or("", |m| m.as_str()));

            tracing::debug!(target: "coverart", path = ?entry.path(), ?types, "Found local cover");
            images.push(CoverArtImage::local_file(entry.path(), types, true, true));
        }

        images
    }
}

impl CoverArtProvider for LocalProvider {
    fn name(&self) -> &str {
        ProviderId::Local.name()
    }

    fn enabled(&self, ctx: &ProviderContext<'_>) -> bool {
        ctx.config.providers.use_local && !ctx.front_image_found
    }

    fn queue_images(&self, ctx: &ProviderContext<'_>) -> Result<QueueOutcome, ProviderError> {
        let mut dirs_done: HashSet<PathBuf> = HashSet::new();
        let mut images = Vec::new();

        for file in ctx.files {
            let Some(dir) = file.parent() else {
                continue;
            };
            if !dirs_done.insert(dir.to_path_buf()) {
                continue;
            }
            images.extend(self.find_local_images(dir));
        }

        Ok(QueueOutcome::Finished(images))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::{Config, LocalConfig};
    use crate::metadata::Metadata;
    use crate::musicbrainz::Release;
    use crate::test_utils::release_json;

    fn provider() -> LocalProvider {
        LocalProvider::new(&LocalConfig::default().cover_regex).unwrap()
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    fn finished(outcome: QueueOutcome) -> Vec<CoverArtImage> {
        match outcome {
            QueueOutcome::Finished(images) => images,
            QueueOutcome::Wait(_) => panic!("local provider must not wait"),
        }
    }

    #[test]
    fn test_matches_are_case_insensitive_and_typed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Cover.JPG");
        touch(dir.path(), "cover-back.png");
        touch(dir.path(), "folder booklet front.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "scan.jpg");

        let images = provider().find_local_images(dir.path());
        let by_name: Vec<(String, Vec<String>)> = images
            .iter()
            .map(|i| {
                let name = i.local_path().unwrap().file_name().unwrap().to_string_lossy().into_owned();
                (name, i.types().to_vec())
            })
            .collect();

        assert_eq!(
            by_name,
            vec![
                ("Cover.JPG".to_string(), vec!["front".to_string()]),
                ("cover-back.png".to_string(), vec!["back".to_string()]),
                (
                    "folder booklet front.jpg".to_string(),
                    vec!["front".to_string(), "booklet".to_string()]
                ),
            ]
        );
        assert!(images.iter().all(|i| i.support_types() && i.support_multi_types()));
    }

    #[test]
    fn test_pattern_without_group_yields_front_images() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "art.png");

        let provider = LocalProvider::new(r"^art\.png$").unwrap();
        let images = provider.find_local_images(dir.path());
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].types(), ["front"]);
        assert!(images[0].is_front_image());
    }

    #[test]
    fn test_subdirectories_are_scanned() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("scans")).unwrap();
        touch(&dir.path().join("scans"), "cover_back.jpg");

        let images = provider().find_local_images(dir.path());
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].types(), ["back"]);
    }

    #[test]
    fn test_each_directory_scanned_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cover.jpg");
        let files = vec![dir.path().join("01.flac"), dir.path().join("02.flac")];

        let release: Release = serde_json::from_str(&release_json("r1")).unwrap();
        let metadata = Metadata::new();
        let config = Config::default();
        let ctx = ProviderContext {
            release: &release,
            metadata: &metadata,
            files: &files,
            config: &config,
            front_image_found: false,
        };

        let images = finished(provider().queue_images(&ctx).unwrap());
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_disabled_once_front_found() {
        let release: Release = serde_json::from_str(&release_json("r1")).unwrap();
        let metadata = Metadata::new();
        let config = Config::default();
        let mut ctx = ProviderContext {
            release: &release,
            metadata: &metadata,
            files: &[],
            config: &config,
            front_image_found: false,
        };
        assert!(provider().enabled(&ctx));

        ctx.front_image_found = true;
        assert!(!provider().enabled(&ctx));
    }
}
