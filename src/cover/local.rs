//! Translation of the `/local/` namespace to image files on disk.
//!
//! Local library backends publish artwork as `/local/<file>`, meaning
//! "a file in my image directory". The directory is part of the
//! configuration and is resolved once when the translator is built.

use std::path::PathBuf;

use super::uri::ArtUri;

/// Why a local-namespace URI could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalPathError {
    #[error("no local image directory configured")]
    NotConfigured,

    #[error("local URI {0:?} has no file name")]
    NoFileName(String),
}

/// The configured local image directory.
#[derive(Debug, Clone, Default)]
pub struct LocalImageDir {
    base: Option<PathBuf>,
}

impl LocalImageDir {
    /// Create a translator for an optional base directory.
    ///
    /// Relative directories are made absolute against the current
    /// directory. A missing directory is reported here, once.
    pub fn new(base: Option<PathBuf>) -> Self {
        let base = base.map(|dir| std::path::absolute(&dir).unwrap_or(dir));
        match &base {
            Some(dir) if !dir.is_dir() => {
                tracing::warn!("Local image directory {:?} does not exist", dir);
            }
            Some(dir) => tracing::debug!("Local image directory: {:?}", dir),
            None => {
                tracing::warn!("No local image directory configured; /local/ art is unavailable")
            }
        }
        Self { base }
    }

    /// Map `/local/.../<name>` to `file://<base>/<name>`.
    pub fn translate(&self, uri: &ArtUri) -> Result<ArtUri, LocalPathError> {
        let base = self.base.as_ref().ok_or(LocalPathError::NotConfigured)?;
        let name = uri
            .basename()
            .ok_or_else(|| LocalPathError::NoFileName(uri.as_str().to_string()))?;
        Ok(ArtUri::from_path(&base.join(name)))
    }
}
