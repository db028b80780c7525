//! mpd-albumart - An MPD album art server.
//!
//! Serves the `albumart` command: art for a track, album or image URI is
//! resolved through the library, fetched once, and streamed to clients in
//! fixed-size chunks from a shared cache.

pub mod cli;
pub mod config;
pub mod cover;
pub mod error;
pub mod library;
pub mod model;
pub mod protocol;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive(format!("mpd_albumart={}", level).parse()?))
        .init();

    cli::run_command(&args)
}
