//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `serve`: Run the MPD album art server
//! - `fetch`: Pull one image through the chunk protocol

mod fetch;
mod serve;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::error;

pub use fetch::cmd_fetch;
pub use serve::cmd_serve;

/// MPD album art server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(short, long, global = true, env = "MPD_ALBUMART_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve album art over the MPD protocol (default)
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "MPD_ALBUMART_BIND")]
        bind: Option<String>,
        /// Directory backing `/local/` image URIs
        #[arg(long, env = "MPD_ALBUMART_IMAGE_DIR")]
        image_dir: Option<PathBuf>,
        /// Library manifest (TOML)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Fetch the art for one identifier, chunk by chunk
    Fetch {
        /// Track, album or image URI
        identifier: String,
        /// Write the image here instead of printing a summary
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory backing `/local/` image URIs
        #[arg(long, env = "MPD_ALBUMART_IMAGE_DIR")]
        image_dir: Option<PathBuf>,
        /// Library manifest (TOML)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the default config file location
    ConfigPath,
}

/// Run the specified CLI command. No subcommand means `serve`.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::ConfigPath) => {
            match config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine config directory"),
            }
            Ok(())
        }
        Some(Commands::Serve {
            bind,
            image_dir,
            manifest,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_overrides(&mut config, image_dir, manifest);
            if let Some(bind) = bind {
                config.server.bind = bind.clone();
            }
            let rt = Runtime::new()?;
            cmd_serve(&rt, &config)
        }
        Some(Commands::Fetch {
            identifier,
            output,
            image_dir,
            manifest,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_overrides(&mut config, image_dir, manifest);
            let rt = Runtime::new()?;
            cmd_fetch(&rt, &config, identifier, output.as_deref())
        }
        None => {
            let config = load_config(cli.config.as_deref())?;
            let rt = Runtime::new()?;
            cmd_serve(&rt, &config)
        }
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// An explicit config path must load; the default location may be absent.
fn load_config(path: Option<&Path>) -> error::Result<Config> {
    match path {
        Some(path) => Ok(config::load_from(path)?),
        None => Ok(config::load()),
    }
}

fn apply_overrides(config: &mut Config, image_dir: &Option<PathBuf>, manifest: &Option<PathBuf>) {
    if let Some(dir) = image_dir {
        config.local.image_dir = Some(dir.clone());
    }
    if let Some(manifest) = manifest {
        config.library.manifest = Some(manifest.clone());
    }
}
