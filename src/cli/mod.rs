//! Command-line interface for mpd-albumart.
//!
//! Runs the album art server, or fetches a single image through the same
//! chunked path a client would use.

mod commands;

pub use commands::{Cli, Commands, run_command};
