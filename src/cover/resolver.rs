//! Art resolver - finds where the art for an identifier actually lives.
//!
//! The identifier a client asks about is rarely the location of its art.
//! Strategies are tried in order and the first hit wins:
//!
//! 1. `/local/` identifiers are translated to the local image directory,
//!    and nothing else is tried for them
//! 2. Images the library publishes for the identifier itself
//! 3. Images published for the album that owns the identifier
//! 4. The identifier itself, when it is an `http(s)` URL
//!
//! Library failures are logged and count as "nothing found" for that step.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::library::Library;
use crate::model::Image;

use super::ArtError;
use super::local::LocalImageDir;
use super::uri::ArtUri;

/// Images at least this wide are preferred; the narrowest of them wins.
pub const PREFERRED_MIN_WIDTH: u32 = 600;

/// Which strategy produced a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtSource {
    /// `/local/` identifier mapped into the image directory
    LocalNamespace,
    /// Image published for the identifier
    Direct,
    /// Image published for the owning album
    Album(String),
    /// The identifier is itself an image URL
    RawUrl,
}

/// A fetchable location and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArt {
    pub location: ArtUri,
    pub source: ArtSource,
}

/// Pick one image out of a candidate list.
///
/// Prefers the narrowest image at least [`PREFERRED_MIN_WIDTH`] wide, which
/// keeps transfers small without going blurry; otherwise the widest image.
/// Unknown widths count as 0. On ties the earlier candidate wins.
pub fn select_image(candidates: &[Image]) -> Option<&Image> {
    candidates
        .iter()
        .filter(|image| image.ordering_width() >= PREFERRED_MIN_WIDTH)
        .min_by_key(|image| image.ordering_width())
        .or_else(|| {
            // max_by_key keeps the last maximum, so walk backwards
            candidates
                .iter()
                .rev()
                .max_by_key(|image| image.ordering_width())
        })
}

/// Resolves identifiers to fetchable art locations.
pub struct ArtResolver {
    library: Arc<dyn Library>,
    local: LocalImageDir,
}

impl ArtResolver {
    pub fn new(library: Arc<dyn Library>, local: LocalImageDir) -> Self {
        Self { library, local }
    }

    /// Resolve a validated identifier to a location.
    ///
    /// Returns [`ArtError::NoArtFound`] when every strategy comes up empty.
    pub async fn resolve(&self, uri: &ArtUri) -> Result<ResolvedArt, ArtError> {
        if uri.is_local_namespace() {
            return match self.local.translate(uri) {
                Ok(location) => Ok(ResolvedArt {
                    location,
                    source: ArtSource::LocalNamespace,
                }),
                Err(e) => {
                    debug!("Cannot translate {}: {}", uri, e);
                    Err(ArtError::NoArtFound(uri.to_string()))
                }
            };
        }

        if let Some(location) = self.lookup_images(uri.as_str()).await {
            return Ok(ResolvedArt {
                location,
                source: ArtSource::Direct,
            });
        }

        if let Some(album_uri) = self.find_album(uri.as_str()).await
            && let Some(location) = self.lookup_images(&album_uri).await
        {
            return Ok(ResolvedArt {
                location,
                source: ArtSource::Album(album_uri),
            });
        }

        if uri.scheme().is_remote() {
            return Ok(ResolvedArt {
                location: uri.clone(),
                source: ArtSource::RawUrl,
            });
        }

        Err(ArtError::NoArtFound(uri.to_string()))
    }

    /// Best image the library publishes for `uri`, as a fetchable location.
    async fn lookup_images(&self, uri: &str) -> Option<ArtUri> {
        let images = match self.library.get_images(&[uri.to_string()]).await {
            Ok(images) => images,
            Err(e) => {
                warn!("Image lookup failed for {}: {}", uri, e);
                return None;
            }
        };

        let image = select_image(images.get(uri)?)?;
        debug!("Selected image {} ({:?}px) for {}", image.uri, image.width, uri);
        self.fetchable(&image.uri)
    }

    /// Album URI of the first search hit for `uri`.
    async fn find_album(&self, uri: &str) -> Option<String> {
        let results = match self.library.search(uri).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Library search failed for {}: {}", uri, e);
                return None;
            }
        };

        let album_uri = results
            .iter()
            .find_map(|result| result.first_album_uri())
            .filter(|album_uri| *album_uri != uri)?;
        debug!("Found album {} for {}", album_uri, uri);
        Some(album_uri.to_string())
    }

    /// Turn a published image URI into something the fetcher understands.
    fn fetchable(&self, image_uri: &str) -> Option<ArtUri> {
        let parsed = match ArtUri::parse(image_uri) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Library published unusable image URI {:?}: {}", image_uri, e);
                return None;
            }
        };

        if !parsed.is_local_namespace() {
            return Some(parsed);
        }
        match self.local.translate(&parsed) {
            Ok(location) => Some(location),
            Err(e) => {
                debug!("Cannot translate image {}: {}", parsed, e);
                None
            }
        }
    }
}
