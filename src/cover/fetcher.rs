//! Byte retrieval for resolved art locations.
//!
//! [`Fetcher`] is the transport seam: given an [`ArtUri`] it returns the
//! whole image or a [`FetchError`]. [`UriFetcher`] dispatches on the
//! scheme: `file:` reads from disk, `http:`/`https:` go through reqwest.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::uri::{ArtUri, Scheme};

/// Why a fetch failed.
///
/// The protocol reply never shows this; it exists for logs.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("file URI {0:?} does not name a local path")]
    BadFileUri(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Trait for fetching art bytes.
///
/// Implement this trait to substitute the transport in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full content at `location`.
    async fn fetch(&self, location: &ArtUri) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher for `file:` and `http(s):` locations.
pub struct UriFetcher {
    http_client: reqwest::Client,
}

impl UriFetcher {
    /// Create a fetcher with a per-request timeout.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http_client })
    }

    async fn fetch_file(&self, location: &ArtUri) -> Result<Vec<u8>, FetchError> {
        let path = location
            .file_path()
            .ok_or_else(|| FetchError::BadFileUri(location.as_str().to_string()))?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::Io(path, e))
    }

    async fn fetch_http(&self, location: &ArtUri) -> Result<Vec<u8>, FetchError> {
        let response = self.http_client.get(location.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Fetcher for UriFetcher {
    async fn fetch(&self, location: &ArtUri) -> Result<Vec<u8>, FetchError> {
        match location.scheme() {
            Scheme::File => self.fetch_file(location).await,
            Scheme::Http | Scheme::Https => self.fetch_http(location).await,
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
