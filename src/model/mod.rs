//! Core data models shared with the music library backend.
//!
//! Defines the entities the art resolver consumes: [`Image`], [`Track`],
//! [`Album`], and [`SearchResult`]. They deserialize straight from the
//! library manifest, so every optional field defaults to `None`.

use serde::{Deserialize, Serialize};

/// An image candidate published by the library for some URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Location of the image (any scheme, or a `/local/` path)
    pub uri: String,
    /// Width in pixels, when the backend knows it
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels, when the backend knows it
    #[serde(default)]
    pub height: Option<u32>,
}

impl Image {
    /// Create an image candidate with a known width and height.
    pub fn new(uri: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            uri: uri.into(),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Width used for ordering; unknown width sorts as 0.
    pub fn ordering_width(&self) -> u32 {
        self.width.unwrap_or(0)
    }
}

/// An album in the music library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Album URI (its own identifier for image lookup)
    pub uri: String,
    /// Album title
    #[serde(default)]
    pub name: Option<String>,
}

/// A track in the music library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track URI
    pub uri: String,
    /// Track title
    #[serde(default)]
    pub name: Option<String>,
    /// Owning album, if known
    #[serde(default)]
    pub album: Option<Album>,
}

/// One backend's answer to a library search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Matching tracks
    pub tracks: Vec<Track>,
}

impl SearchResult {
    /// URI of the first album with a non-empty identifier among the tracks.
    pub fn first_album_uri(&self) -> Option<&str> {
        self.tracks
            .iter()
            .filter_map(|t| t.album.as_ref())
            .map(|a| a.uri.as_str())
            .find(|uri| !uri.is_empty())
    }
}
