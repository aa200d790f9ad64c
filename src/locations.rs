//! Source location resolution
//!
//! A source handed to the loader is either a remote URI, a path to an existing
//! local file, or the XML markup itself. This module decides which.

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use url::Url;

static REMOTE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^http(s)?://").unwrap());

/// Resource location - can be a URL, file path, or literal markup
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// Remote URL
    Url(Url),
    /// XML markup given inline
    Markup(String),
}

impl Location {
    /// Classify a source string.
    ///
    /// `force_uri` (or an `http://`/`https://` prefix) makes the source a URL.
    /// Otherwise a source naming an existing file is a path, and anything
    /// else is taken to be markup.
    pub fn resolve(source: &str, force_uri: bool) -> Result<Self> {
        if force_uri || is_remote(source) {
            return Ok(Location::Url(Url::parse(source)?));
        }

        let path = Path::new(source);
        if path.is_file() {
            return Ok(Location::Path(path.to_path_buf()));
        }

        Ok(Location::Markup(source.to_string()))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::Markup(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }

    /// Short description for log output; never the full markup
    pub fn kind(&self) -> &'static str {
        match self {
            Location::Path(_) => "path",
            Location::Url(_) => "url",
            Location::Markup(_) => "markup",
        }
    }
}

/// True when the source carries an `http://` or `https://` prefix
pub fn is_remote(source: &str) -> bool {
    REMOTE_PREFIX.is_match(source)
}
