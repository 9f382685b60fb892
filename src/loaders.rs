//! Fetching schema and instance sources
//!
//! A [`Loader`] turns a [`Location`] into text or a parsed [`Document`],
//! charging everything it reads against its [`Limits`].

use std::fs;
use std::path::Path;

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;

/// Reads sources named by a [`Location`]
#[derive(Debug, Clone, Default)]
pub struct Loader {
    limits: Limits,
    allow_remote: bool,
}

impl Loader {
    /// Local-only loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the budgets applied to loaded sources
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Opt in to network locations
    ///
    /// No transport is bundled, so remote locations still fail once allowed;
    /// the error only changes from a refusal to an unsupported scheme.
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Budgets charged by this loader
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Read the text behind a location
    pub fn load(&self, location: &Location) -> Result<String> {
        log::debug!("loading {}", location);
        let text = match location {
            Location::Path(path) => self.read_file(path)?,
            Location::String(source) => source.clone(),
            Location::Url(url) if !self.allow_remote => {
                return Err(Error::Resource(format!("refusing remote location {}", url)));
            }
            Location::Url(url) => {
                return Err(Error::Resource(format!(
                    "no transport for '{}' locations: {}",
                    url.scheme(),
                    url
                )));
            }
        };
        self.limits.check_xml_size(text.len())?;
        Ok(text)
    }

    /// Read and parse the document behind a location
    pub fn load_document(&self, location: &Location) -> Result<Document> {
        let text = self.load(location)?;
        Document::parse_with_limits(&text, &self.limits)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        let unreadable =
            |e: std::io::Error| Error::Resource(format!("cannot read '{}': {}", path.display(), e));

        // refuse oversized files before pulling them into memory
        let size = fs::metadata(path).map_err(unreadable)?.len();
        self.limits
            .check_xml_size(usize::try_from(size).unwrap_or(usize::MAX))?;
        fs::read_to_string(path).map_err(unreadable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<element name='root'><text/></element>").unwrap();

        let content = Loader::new()
            .load(&Location::Path(file.path().to_path_buf()))
            .unwrap();
        assert!(content.contains("<element name='root'>"));
    }

    #[test]
    fn test_load_inline_source() {
        let location = Location::String("<empty/>".to_string());
        assert_eq!(Loader::new().load(&location).unwrap(), "<empty/>");
    }

    #[test]
    fn test_load_document() {
        let location = Location::String("<a><b/></a>".to_string());
        let doc = Loader::new().load_document(&location).unwrap();
        assert_eq!(doc.root().name().map(|n| n.local_name.as_str()), Some("a"));

        let broken = Location::String("<a><b></a>".to_string());
        assert!(Loader::new().load_document(&broken).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let location = Location::Path("/definitely/not/here.rng".into());
        let result = Loader::new().load(&location);
        assert!(matches!(result, Err(Error::Resource(_))));
    }

    #[test]
    fn test_remote_rejected() {
        let location = Location::parse("https://example.com/odf.rng").unwrap();
        let refused = Loader::new().load(&location).unwrap_err();
        assert!(refused.to_string().contains("refusing"));

        let unsupported = Loader::new()
            .with_allow_remote(true)
            .load(&location)
            .unwrap_err();
        assert!(unsupported.to_string().contains("https"));
    }

    #[test]
    fn test_oversized_sources() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", "x".repeat(64)).unwrap();

        let loader = Loader::new().with_limits(Limits {
            max_xml_size: 32,
            ..Limits::default()
        });
        let from_disk = loader.load(&Location::Path(file.path().to_path_buf()));
        assert!(matches!(from_disk, Err(Error::LimitExceeded(_))));

        let inline = loader.load(&Location::String("y".repeat(33)));
        assert!(matches!(inline, Err(Error::LimitExceeded(_))));
    }
}
