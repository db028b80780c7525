//! The `albumart` command.
//!
//! ```text
//! albumart {URI} {OFFSET}
//! ```
//!
//! Returns the chunk of the art image for URI starting at OFFSET. The first
//! request resolves and fetches the whole image into the [`ChunkCache`];
//! later requests slice the cached copy. Once a chunk reaches the end of
//! the image the entry is dropped, so the next request for the same URI
//! starts over.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::cover::{ArtError, ArtResolver, ArtUri, ChunkCache, Fetcher, LocalImageDir, UriFetcher};
use crate::error::ResultExt;
use crate::library::{Library, ManifestLibrary};

use super::response::ArtReply;

/// Serves album art in chunks.
///
/// Cheap to share: wrap in an `Arc` and hand to every connection.
pub struct AlbumArtService {
    cache: Arc<ChunkCache>,
    resolver: ArtResolver,
    fetcher: Arc<dyn Fetcher>,
}

impl AlbumArtService {
    pub fn new(cache: Arc<ChunkCache>, resolver: ArtResolver, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache,
            resolver,
            fetcher,
        }
    }

    /// Wire up the production collaborators from configuration.
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let library: Arc<dyn Library> = match &config.library.manifest {
            Some(path) => Arc::new(
                ManifestLibrary::load(path).with_context("loading library manifest")?,
            ),
            None => {
                tracing::info!("No library manifest configured; only URL and /local/ art is served");
                Arc::new(ManifestLibrary::empty())
            }
        };
        let fetcher = UriFetcher::new(config.fetch.timeout(), &config.fetch.user_agent)?;
        let local = LocalImageDir::new(config.local.image_dir.clone());

        Ok(Self::new(
            Arc::new(ChunkCache::new()),
            ArtResolver::new(library, local),
            Arc::new(fetcher),
        ))
    }

    /// The shared chunk cache.
    pub fn cache(&self) -> &Arc<ChunkCache> {
        &self.cache
    }

    /// Handle `albumart <identifier> <offset>`.
    ///
    /// Never fails: every problem becomes [`ArtReply::NoArt`] and a log line.
    pub async fn albumart(&self, identifier: &str, offset: u64) -> ArtReply {
        match self.read_chunk(identifier, offset).await {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    ArtError::FetchFailure { .. } => {
                        warn!(identifier, kind = e.kind(), "Album art unavailable: {}", e)
                    }
                    _ => debug!(identifier, kind = e.kind(), "No album art: {}", e),
                }
                ArtReply::NoArt
            }
        }
    }

    async fn read_chunk(&self, identifier: &str, offset: u64) -> Result<ArtReply, ArtError> {
        // Validate before touching the cache so junk never becomes a key
        let uri = ArtUri::parse(identifier)?;

        let blob = self
            .cache
            .get_or_fetch(identifier, || self.resolve_and_fetch(&uri))
            .await?;

        let chunk = blob.chunk(offset);
        let reply = ArtReply::from_chunk(&chunk);
        if chunk.is_final() {
            self.cache.evict(identifier);
            debug!(
                "Finished art transfer for {} ({} bytes)",
                identifier,
                chunk.total_size
            );
        }
        Ok(reply)
    }

    async fn resolve_and_fetch(&self, uri: &ArtUri) -> Result<Vec<u8>, ArtError> {
        let resolved = self.resolver.resolve(uri).await?;
        debug!(
            "Resolved art for {} to {} via {:?}",
            uri, resolved.location, resolved.source
        );

        self.fetcher
            .fetch(&resolved.location)
            .await
            .map_err(|e| ArtError::fetch_failure(&resolved.location, e))
    }
}
