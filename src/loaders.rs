//! Resource loading utilities
//!
//! This module turns a source specifier (file path, XML markup or URI) into a
//! parsed [`Document`].

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;
use std::io::Read;
use std::time::Duration;

/// Default timeout for remote fetches
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource loader for schemas and documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
    /// Timeout applied to remote fetches
    timeout: Duration,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Set the remote fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let content = match location {
            Location::Path(path) => fs::read_to_string(path).map_err(|e| {
                Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
            })?,
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(
                        "Remote resources are not allowed".to_string(),
                    ));
                }
                self.fetch(url.as_str())?
            }
            Location::Markup(s) => s.clone(),
        };

        self.limits.check_xml_size(content.len())?;

        Ok(content)
    }

    fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching remote resource");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Resource(format!("Failed to build HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::Resource(format!("Failed to fetch '{}': {}", url, e)))?;

        let declared = response.content_length();
        self.read_bounded(response, declared)
            .map_err(|e| match e {
                Error::Io(e) => Error::Resource(format!("Failed to read '{}': {}", url, e)),
                other => other,
            })
    }

    /// Read a body, refusing it before download when its declared length is
    /// over the size limit and reading at most one byte past the limit
    fn read_bounded(&self, body: impl Read, declared: Option<u64>) -> Result<String> {
        if let Some(length) = declared {
            self.limits
                .check_xml_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }

        let cap = u64::try_from(self.limits.max_xml_size)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let mut content = String::new();
        body.take(cap).read_to_string(&mut content)?;
        self.limits.check_xml_size(content.len())?;

        Ok(content)
    }

    /// Load and parse XML from a path, markup or URI.
    ///
    /// Returns `Ok(None)` for an empty source. Every failure along the way
    /// (bad URI, unreadable file, network error, malformed markup) is
    /// reported as [`Error::InvalidSource`].
    pub fn load_xml(&self, source: &str, force_uri: bool) -> Result<Option<Document>> {
        if source.trim().is_empty() {
            return Ok(None);
        }

        self.resolve_and_parse(source, force_uri)
            .map(Some)
            .map_err(|e| {
                tracing::debug!(error = %e, "source rejected");
                Error::InvalidSource
            })
    }

    fn resolve_and_parse(&self, source: &str, force_uri: bool) -> Result<Document> {
        let location = Location::resolve(source, force_uri)?;
        tracing::trace!(kind = location.kind(), "resolved source");

        let content = self.load(&location)?;
        Document::parse_with_limits(content.as_bytes(), &self.limits)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load XML with a default [`Loader`]; see [`Loader::load_xml`]
pub fn load_xml(source: &str, force_uri: bool) -> Result<Option<Document>> {
    Loader::new().load_xml(source, force_uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert!(content.contains("<root>test</root>"));
    }

    #[test]
    fn test_load_from_markup() {
        let location = Location::Markup("<root>test</root>".to_string());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert_eq!(content, "<root>test</root>");
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024); // 11 MB
        write!(file, "{}", large_content).unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new().with_limits(Limits::strict());
        let result = loader.load(&location);

        // Strict limits (10 MB max) should reject 11MB file
        assert!(result.is_err());
    }

    fn small_loader() -> Loader {
        Loader::new().with_limits(Limits {
            max_xml_size: 16,
            ..Limits::default()
        })
    }

    #[test]
    fn test_declared_length_is_refused_before_reading() {
        struct Unreadable;
        impl Read for Unreadable {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                panic!("body read despite an oversized Content-Length");
            }
        }

        let result = small_loader().read_bounded(Unreadable, Some(17));
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_undeclared_body_is_read_one_byte_past_the_limit() {
        let mut body = std::io::Cursor::new(vec![b'x'; 1024]);
        let result = small_loader().read_bounded(&mut body, None);

        assert!(matches!(result, Err(Error::LimitExceeded(_))));
        assert_eq!(body.position(), 17);
    }

    #[test]
    fn test_body_within_limit() {
        let body = std::io::Cursor::new("<DIF/>");
        assert_eq!(small_loader().read_bounded(body, Some(6)).unwrap(), "<DIF/>");
    }

    #[test]
    fn test_remote_disallowed() {
        let loader = Loader::new().with_allow_remote(false);
        let location = Location::resolve("http://localhost/dif.xml", false).unwrap();
        assert!(matches!(loader.load(&location), Err(Error::Resource(_))));
    }

    #[test]
    fn test_load_xml_empty_source() {
        assert!(load_xml("", false).unwrap().is_none());
        assert!(load_xml("   ", false).unwrap().is_none());
    }

    #[test]
    fn test_load_xml_markup() {
        let doc = load_xml("<DIF><Entry_ID>x</Entry_ID></DIF>", false)
            .unwrap()
            .unwrap();
        assert_eq!(doc.root().unwrap().local_name(), "DIF");
    }

    #[test]
    fn test_load_xml_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<DIF>\n  <Entry_ID>abc</Entry_ID>\n</DIF>").unwrap();

        let doc = load_xml(file.path().to_str().unwrap(), false)
            .unwrap()
            .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.children[0].text(), "abc");
    }

    #[test]
    fn test_load_xml_invalid_markup() {
        let result = load_xml("<DIF><Entry_ID></DIF>", false);
        assert!(matches!(result, Err(Error::InvalidSource)));
    }

    #[test]
    fn test_load_xml_forced_uri_that_is_not_one() {
        let result = load_xml("<DIF/>", true);
        assert!(matches!(result, Err(Error::InvalidSource)));
    }
}
