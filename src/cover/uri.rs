//! Identifier validation and structured URI parsing.
//!
//! Every identifier is parsed into an [`ArtUri`] before anything else looks
//! at it. Later stages dispatch on [`Scheme`] instead of sniffing prefixes.
//!
//! Accepted shapes:
//! - `scheme:rest` where the scheme is an ASCII letter followed by letters,
//!   digits, `+`, `-` or `.`
//! - `/local/<path>`, the reserved local-namespace prefix

use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved prefix of the local image namespace.
pub const LOCAL_PREFIX: &str = "/local/";

/// Why an identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("empty identifier")]
    Empty,

    #[error("no scheme in identifier {0:?}")]
    MissingScheme(String),
}

/// URI scheme, as far as art resolution cares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `file:` on the local filesystem
    File,
    /// `http:`
    Http,
    /// `https:`
    Https,
    /// The `/local/` namespace (no real scheme)
    Local,
    /// Any other backend scheme (`spotify:`, `local:`, ...)
    Other(String),
}

impl Scheme {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "file" => Scheme::File,
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => Scheme::Other(other.to_string()),
        }
    }

    /// Whether the scheme is fetched over the network.
    pub fn is_remote(&self) -> bool {
        matches!(self, Scheme::Http | Scheme::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::File => f.write_str("file"),
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
            Scheme::Local => f.write_str("local namespace"),
            Scheme::Other(name) => f.write_str(name),
        }
    }
}

/// A validated identifier split into scheme and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtUri {
    raw: String,
    scheme: Scheme,
    /// Everything after `scheme:`, or after `/local/` for the local namespace
    path: String,
}

impl ArtUri {
    /// Validate and parse an identifier.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if input.is_empty() {
            return Err(UriError::Empty);
        }

        if let Some(rest) = input.strip_prefix(LOCAL_PREFIX) {
            return Ok(Self {
                raw: input.to_string(),
                scheme: Scheme::Local,
                path: rest.to_string(),
            });
        }

        let (name, rest) = input
            .split_once(':')
            .filter(|(name, _)| is_scheme_name(name))
            .ok_or_else(|| UriError::MissingScheme(input.to_string()))?;

        Ok(Self {
            raw: input.to_string(),
            scheme: Scheme::from_name(name),
            path: rest.to_string(),
        })
    }

    /// Build a `file://` URI for an absolute filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let encoded: Vec<String> = path
            .to_string_lossy()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let joined = encoded.join("/");
        let path_part = if joined.starts_with('/') {
            format!("//{}", joined)
        } else {
            format!("///{}", joined)
        };

        Self {
            raw: format!("file:{}", path_part),
            scheme: Scheme::File,
            path: path_part,
        }
    }

    /// The identifier exactly as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The part after the scheme (or after the local prefix).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_local_namespace(&self) -> bool {
        self.scheme == Scheme::Local
    }

    /// Final non-empty path segment, ignoring any query or fragment.
    pub fn basename(&self) -> Option<&str> {
        let path = self
            .path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        path.rsplit('/').find(|segment| !segment.is_empty())
    }

    /// Filesystem path for a `file:` URI.
    ///
    /// Accepts `file:///abs`, `file://localhost/abs` and `file:/abs`;
    /// percent-escapes are decoded. Returns `None` for other schemes or
    /// remote hosts.
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.scheme != Scheme::File {
            return None;
        }

        let path = match self.path.strip_prefix("//") {
            Some(authority_and_path) => {
                let slash = authority_and_path.find('/')?;
                let (host, path) = authority_and_path.split_at(slash);
                if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
                    return None;
                }
                path
            }
            None => self.path.as_str(),
        };

        let decoded = urlencoding::decode(path).ok()?;
        Some(PathBuf::from(decoded.into_owned()))
    }
}

impl fmt::Display for ArtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_scheme_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
