//! Cover Minder - fetch and inspect cover art from the command line.

use clap::Parser;
use cover_minder::cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::from_default_env()
                .add_directive("cover_minder=info".parse()?)
                .add_directive("coverart=info".parse()?),
        )
        .init();

    cli::run_command(&args)
}
