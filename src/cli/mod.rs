//! Command-line interface for cover-minder.
//!
//! Fetches cover art for a release and inspects images on disk or in tags.

mod commands;

pub use commands::{Cli, Commands, run_command};
