//! Image identification and tag picture listing.

use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::cover::{ContentStore, embedded, identify};

/// Print what an image file is
pub fn cmd_identify(path: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let info = identify(&data).with_context(|| format!("identifying {}", path.display()))?;

    println!("{}", path.display());
    println!("  Format:     {}", info.mime_type());
    println!("  Extension:  {}", info.extension());
    println!("  Dimensions: {}x{}", info.width, info.height);
    println!("  Size:       {} bytes", info.data_len);
    Ok(())
}

/// List the pictures embedded in an audio file
pub fn cmd_embedded(config: &Config, path: &Path) -> anyhow::Result<()> {
    let store = ContentStore::in_dir(config.storage.resolved_temp_dir().join("cover-minder"));
    let images = embedded::read_tag_images(path, &store).with_context(|| format!("reading tags of {}", path.display()))?;

    println!("{}: {} picture(s)", path.display(), images.len());
    for image in &images {
        println!("  [{}] {}", image.types_as_string(), image.source());
        if !image.comment().is_empty() {
            println!("      comment: {}", image.comment());
        }
        println!("      {}", image.imageinfo_as_string());
    }

    drop(images);
    store.cleanup();
    Ok(())
}
