//! Where a schema or document comes from
//!
//! The validator never interprets a locator beyond picking the right way to
//! read it: a file on disk, a URL, or source text handed in directly.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::Result;

/// Locator for a schema or instance source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File on the local file system
    Path(PathBuf),
    /// Remote resource
    Url(Url),
    /// Source text held in memory
    String(String),
}

impl Location {
    /// Classify a caller-supplied locator
    ///
    /// Text starting with markup is taken as the source itself, `file:` URLs
    /// become paths and anything else that parses as a URL stays one.
    pub fn parse(locator: &str) -> Result<Self> {
        if locator.trim_start().starts_with('<') {
            return Ok(Location::String(locator.to_string()));
        }

        match Url::parse(locator) {
            Ok(url) if url.scheme() == "file" => Ok(url
                .to_file_path()
                .map(Location::Path)
                .unwrap_or(Location::Url(url))),
            // single-letter schemes are Windows drive letters
            Ok(url) if url.scheme().len() > 1 => Ok(Location::Url(url)),
            _ => Ok(Location::Path(PathBuf::from(locator))),
        }
    }

    /// Whether reading this location needs the network
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Whether this location names a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(path) => write!(f, "{}", path.display()),
            Location::Url(url) => write!(f, "{}", url),
            Location::String(_) => f.write_str("<inline>"),
        }
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}
