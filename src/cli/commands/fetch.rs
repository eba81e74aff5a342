//! Cover art retrieval for one release.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::album::{Album, CoverArtOwner};
use crate::config::Config;
use crate::cover::ContentStore;
use crate::musicbrainz::{MusicBrainzClient, Release};
use crate::providers::build_providers;
use crate::session::{CoverArtSession, SessionOutcome};
use crate::transport::{DownloadTransport, HttpTransport};

/// Fetch cover art for a release and optionally write it to disk
pub fn cmd_fetch(
    rt: &Runtime,
    config: &Config,
    release: &str,
    files: &[PathBuf],
    output: Option<&Path>,
    ignore_embedded: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let release = load_release(config, release).await?;
        println!("Release: {} ({})", release.title, release.id);

        let store = ContentStore::in_dir(config.storage.resolved_temp_dir().join("cover-minder"));
        let mut album = Album::new(release, files.to_vec());
        if !ignore_embedded {
            album.load_original_images(&store);
        }
        let album = Arc::new(album);

        let transport: Arc<dyn DownloadTransport> = Arc::new(HttpTransport::new(&config.network)?);
        let providers = build_providers(config, Arc::clone(&transport))?;
        let owner: Arc<dyn CoverArtOwner> = album.clone();

        let mut session = CoverArtSession::new(config.clone(), transport, store.clone(), owner, providers);
        let outcome = session.retrieve().await?;

        print_summary(&album, outcome);

        if let Some(dir) = output_dir(config, output, files) {
            save_images(config, &album, &dir)?;
        }

        store.cleanup();
        Ok(())
    })
}

/// Read a release JSON file, or look the release up when `release` is not a
/// file.
async fn load_release(config: &Config, release: &str) -> anyhow::Result<Release> {
    let path = Path::new(release);
    if path.is_file() {
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let release = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
        return Ok(release);
    }

    tracing::info!("Looking up release {}", release);
    let client = MusicBrainzClient::new(&config.network)?;
    Ok(client.lookup_release(release).await?)
}

/// Explicit output directory, else the first file's directory when saving to
/// files is enabled.
fn output_dir(config: &Config, output: Option<&Path>, files: &[PathBuf]) -> Option<PathBuf> {
    if let Some(output) = output {
        return Some(output.to_path_buf());
    }
    if !config.saving.save_images_to_files {
        return None;
    }
    files.first().and_then(|f| f.parent()).map(Path::to_path_buf)
}

fn print_summary(album: &Album, outcome: SessionOutcome) {
    let images = album.images();
    println!("Outcome: {:?}", outcome);
    println!();

    if images.is_empty() {
        println!("No cover art found.");
    }
    for image in &images {
        println!("  [{}] {}", image.types_as_string(), image.source());
        println!("      {}", image.imageinfo_as_string());
        if let Some(thumbnail) = image.thumbnail() {
            println!("      thumbnail: {}", thumbnail.imageinfo_as_string());
        }
    }

    let errors = album.errors();
    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for error in errors {
            println!("  {}", error);
        }
    }
}

fn save_images(config: &Config, album: &Album, dir: &Path) -> anyhow::Result<()> {
    let metadata = album.metadata();
    let mut counters = HashMap::new();
    let mut saved = 0;

    for image in &album.images() {
        match image.save(dir, &metadata, &mut counters, &config.saving) {
            Ok(Some(path)) => {
                println!("Saved {}", path.display());
                saved += 1;
            }
            Ok(None) => {}
            Err(e) => eprintln!("Failed to save {}: {}", image, e),
        }
    }

    println!("{} image(s) written to {}", saved, dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::release_json;

    #[tokio::test]
    async fn test_load_release_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.json");
        std::fs::write(&path, release_json("r9")).unwrap();

        let release = load_release(&Config::default(), path.to_str().unwrap()).await.unwrap();
        assert_eq!(release.id, "r9");
    }

    #[tokio::test]
    async fn test_load_release_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_release(&Config::default(), path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }

    #[test]
    fn test_output_dir() {
        let mut config = Config::default();
        let files = vec![PathBuf::from("/music/album/01.flac")];

        assert_eq!(output_dir(&config, None, &files), None);
        assert_eq!(
            output_dir(&config, Some(Path::new("/tmp/out")), &files),
            Some(PathBuf::from("/tmp/out"))
        );

        config.saving.save_images_to_files = true;
        assert_eq!(output_dir(&config, None, &files), Some(PathBuf::from("/music/album")));
    }
}
