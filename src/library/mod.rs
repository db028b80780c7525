//! Music library collaborators.
//!
//! The art resolver only needs two questions answered by a library
//! backend: which images are published for a URI, and which tracks (and
//! therefore albums) a URI belongs to. [`Library`] is that seam.
//!
//! [`ManifestLibrary`] is the bundled backend: a TOML manifest of tracks
//! and image candidates, loaded once at startup.
//!
//! ```toml
//! [[tracks]]
//! uri = "file:///music/Artist/Album/01.flac"
//! name = "Opening"
//! album = { uri = "local:album:abc", name = "Album" }
//!
//! [[images]]
//! uri = "local:album:abc"
//! candidates = [
//!     { uri = "/local/abc-small.jpg", width = 128, height = 128 },
//!     { uri = "https://art.example.com/abc.jpg", width = 1200, height = 1200 },
//! ]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{Image, SearchResult, Track};

/// Errors raised by a library backend.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Failed to read library manifest {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse library manifest {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Library backend error: {0}")]
    Backend(String),
}

/// Trait for the music library backend.
///
/// Implement this trait to plug in another backend or a mock for tests.
#[async_trait]
pub trait Library: Send + Sync {
    /// Look up published images for each URI.
    ///
    /// Every requested URI may be absent from the map or map to an empty
    /// list; both mean "no images".
    async fn get_images(
        &self,
        uris: &[String],
    ) -> Result<HashMap<String, Vec<Image>>, LibraryError>;

    /// Search for tracks matching a URI.
    async fn search(&self, uri: &str) -> Result<Vec<SearchResult>, LibraryError>;
}

/// On-disk shape of the library manifest.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Manifest {
    tracks: Vec<Track>,
    images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    uri: String,
    #[serde(default)]
    candidates: Vec<Image>,
}

/// Library backed by a static TOML manifest.
#[derive(Debug, Default)]
pub struct ManifestLibrary {
    tracks: Vec<Track>,
    images: HashMap<String, Vec<Image>>,
}

impl ManifestLibrary {
    /// An empty library: every lookup comes back empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LibraryError::Read(path.to_path_buf(), e))?;
        let library = Self::from_toml(&contents)
            .map_err(|e| LibraryError::Parse(path.to_path_buf(), e))?;

        tracing::info!(
            "Loaded library manifest {:?}: {} tracks, {} image sets",
            path,
            library.track_count(),
            library.images.len()
        );
        Ok(library)
    }

    /// Parse a manifest from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let manifest: Manifest = toml::from_str(contents)?;

        let mut images: HashMap<String, Vec<Image>> = HashMap::new();
        for entry in manifest.images {
            // Repeated keys accumulate in file order
            images.entry(entry.uri).or_default().extend(entry.candidates);
        }

        Ok(Self {
            tracks: manifest.tracks,
            images,
        })
    }

    /// Number of tracks in the manifest.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[async_trait]
impl Library for ManifestLibrary {
    async fn get_images(
        &self,
        uris: &[String],
    ) -> Result<HashMap<String, Vec<Image>>, LibraryError> {
        Ok(uris
            .iter()
            .map(|uri| (uri.clone(), self.images.get(uri).cloned().unwrap_or_default()))
            .collect())
    }

    async fn search(&self, uri: &str) -> Result<Vec<SearchResult>, LibraryError> {
        let tracks: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| t.uri == uri || t.album.as_ref().is_some_and(|a| a.uri == uri))
            .cloned()
            .collect();

        if tracks.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![SearchResult { tracks }])
    }
}
