//! Album art location, retrieval and chunked caching.
//!
//! This module holds everything behind the `albumart` command:
//!
//! 1. [`uri`] - identifier validation, parsed into scheme and path
//! 2. [`resolver`] - finds where the art lives (library images, album
//!    fallback, raw URL, `/local/` translation)
//! 3. [`fetcher`] - reads the bytes from disk or over HTTP
//! 4. [`cache`] - keeps a fetched image while a client reads it in chunks
//!
//! # Failure handling
//!
//! Every failure is an [`ArtError`]. Clients only ever see "no art"; the
//! variant and its cause go to the log.

pub mod cache;
pub mod fetcher;
pub mod local;
pub mod resolver;
pub mod uri;

pub use cache::{CHUNK_SIZE, CachedBlob, Chunk, ChunkCache};
pub use fetcher::{FetchError, Fetcher, UriFetcher};
pub use local::LocalImageDir;
pub use resolver::{ArtResolver, ArtSource, ResolvedArt};
pub use uri::{ArtUri, Scheme, UriError};

/// Why no art could be served for a request.
#[derive(Debug, thiserror::Error)]
pub enum ArtError {
    /// The identifier failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] UriError),

    /// Every resolution strategy came up empty
    #[error("No art found for {0}")]
    NoArtFound(String),

    /// A location was found but could not be read
    #[error("Failed to fetch {location}: {source}")]
    FetchFailure {
        location: String,
        #[source]
        source: FetchError,
    },
}

impl ArtError {
    /// Create a fetch failure for a location.
    pub fn fetch_failure(location: &ArtUri, source: FetchError) -> Self {
        Self::FetchFailure {
            location: location.to_string(),
            source,
        }
    }

    /// Short name of the failure class, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ArtError::InvalidIdentifier(_) => "invalid_identifier",
            ArtError::NoArtFound(_) => "no_art_found",
            ArtError::FetchFailure { .. } => "fetch_failure",
        }
    }
}
