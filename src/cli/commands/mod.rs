//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `fetch`: run a cover art session for a release
//! - `inspect`: identify image files and list tag pictures

mod fetch;
mod inspect;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};

pub use fetch::cmd_fetch;
pub use inspect::{cmd_embedded, cmd_identify};

/// Cover Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: the OS config directory)
    #[arg(long, global = true, env = "COVER_MINDER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch cover art for a release
    Fetch {
        /// Release JSON file, or a MusicBrainz release ID to look up
        release: String,
        /// Audio files of the release
        files: Vec<PathBuf>,
        /// Write accepted images to this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Ignore pictures already embedded in the files
        #[arg(long)]
        ignore_embedded: bool,
    },
    /// Identify an image file
    Identify {
        /// Path to the image
        path: PathBuf,
    },
    /// List pictures embedded in an audio file's tags
    Embedded {
        /// Path to the audio file
        path: PathBuf,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref());

    match &cli.command {
        Commands::Fetch {
            release,
            files,
            output,
            ignore_embedded,
        } => {
            let rt = Runtime::new()?;
            cmd_fetch(&rt, &config, release, files, output.as_deref(), *ignore_embedded)
        }
        Commands::Identify { path } => cmd_identify(path),
        Commands::Embedded { path } => cmd_embedded(&config, path),
    }
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "cover-minder",
            "fetch",
            "release.json",
            "01.flac",
            "02.flac",
            "--output",
            "out",
        ])
        .unwrap();

        let Commands::Fetch {
            release,
            files,
            output,
            ignore_embedded,
        } = cli.command
        else {
            panic!("expected fetch");
        };
        assert_eq!(release, "release.json");
        assert_eq!(files, vec![PathBuf::from("01.flac"), PathBuf::from("02.flac")]);
        assert_eq!(output, Some(PathBuf::from("out")));
        assert!(!ignore_embedded);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["cover-minder"]).is_err());
    }
}
