//! Error types for difschema
//!
//! This module defines all error types used throughout the library.
//! Validation problems found in an instance document are not errors: they are
//! reported as [`ValidationRecord`](crate::validators::ValidationRecord)s.

use std::fmt;
use thiserror::Error;

/// Result type alias using difschema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for difschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// A source (path, markup or URI) could not be resolved or parsed.
    ///
    /// The underlying cause is deliberately not carried; it is logged at
    /// debug level by the loader.
    #[error("Invalid Source")]
    InvalidSource,

    /// Validation was requested without a document
    #[error("argument error: no XML document provided for validation")]
    MissingDocument,

    /// XML Schema parsing/compiling error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Key error (element name not declared in the schema)
    #[error("key error: {0}")]
    Key(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// XML Schema parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Element declaration the error refers to
    pub element: Option<String>,
    /// Line in the schema source
    pub line: Option<usize>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element: None,
            line: None,
        }
    }

    /// Set the element declaration
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Set the line
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref element) = self.element {
            write!(f, " (element '{}')", element)?;
        }

        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("minOccurs value is not a valid non-negative integer")
            .with_element("Entry_ID")
            .with_line(42);

        let msg = format!("{}", err);
        assert!(msg.contains("minOccurs"));
        assert!(msg.contains("'Entry_ID'"));
        assert!(msg.contains("line 42"));
    }

    #[test]
    fn test_invalid_source_has_no_cause() {
        let err = Error::InvalidSource;
        assert_eq!(err.to_string(), "Invalid Source");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
