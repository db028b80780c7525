//! Test utilities and fixtures for mpd-albumart tests.
//!
//! This module provides the image fixtures the library mocks publish and a
//! helper to wire an [`AlbumArtService`] out of mock collaborators.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{dummy_images, service_with};
//!
//! let library = Arc::new(MockLibrary::empty().with_images("dummy:/a", dummy_images()));
//! let fetcher = Arc::new(MockFetcher::serving_any(b"jpeg".to_vec()));
//! let service = service_with(library, fetcher, LocalImageDir::new(None));
//! ```

use std::sync::Arc;

use crate::cover::{ArtResolver, ChunkCache, Fetcher, LocalImageDir};
use crate::library::Library;
use crate::model::Image;
use crate::protocol::AlbumArtService;

/// The two candidates a typical backend publishes: a 128px thumbnail
/// (`dummy:/albumart.jpg`) and a 640px image (`dummy:/albumart-large.jpg`).
pub fn dummy_images() -> Vec<Image> {
    vec![
        Image::new("dummy:/albumart.jpg", 128, 128),
        Image::new("dummy:/albumart-large.jpg", 640, 640),
    ]
}

/// An image candidate whose dimensions the backend doesn't know.
pub fn image_without_width(uri: &str) -> Image {
    Image {
        uri: uri.to_string(),
        width: None,
        height: None,
    }
}

/// Build a service with a fresh cache around the given collaborators.
pub fn service_with(
    library: Arc<dyn Library>,
    fetcher: Arc<dyn Fetcher>,
    local: LocalImageDir,
) -> AlbumArtService {
    AlbumArtService::new(
        Arc::new(ChunkCache::new()),
        ArtResolver::new(library, local),
        fetcher,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::resolver::select_image;

    #[test]
    fn test_dummy_images_prefer_large() {
        let images = dummy_images();
        assert_eq!(select_image(&images).unwrap().uri, "dummy:/albumart-large.jpg");
    }

    #[test]
    fn test_image_without_width() {
        let image = image_without_width("dummy:/x.jpg");
        assert_eq!(image.ordering_width(), 0);
        assert!(image.height.is_none());
    }
}
