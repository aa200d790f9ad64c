//! Limits and constraints for XML processing
//!
//! Bounds applied while reading sources, building document trees and walking
//! schema declarations. The schema depth bound is what stops the introspector
//! on cyclic element references.

use crate::error::{Error, Result};

/// Resource limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth in a parsed document
    pub max_xml_depth: usize,

    /// Maximum XML source size in bytes
    pub max_xml_size: usize,

    /// Maximum number of attributes per element
    pub max_attributes: usize,

    /// Maximum nesting of element declarations followed during a schema walk
    pub max_schema_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_attributes: 1000,
            max_schema_depth: 100,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter bounds for untrusted harvested records
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_attributes: 100,
            max_schema_depth: 20,
        }
    }

    /// Looser bounds for large aggregated dumps
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_attributes: 10000,
            max_schema_depth: 1000,
        }
    }

    /// Element nesting while parsing
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        within("XML depth", depth, self.max_xml_depth)
    }

    /// Source size in bytes
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        within("XML size in bytes", size, self.max_xml_size)
    }

    /// Attributes on one element
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        within("Attribute count", count, self.max_attributes)
    }

    /// Declaration nesting during a schema walk
    pub fn check_schema_depth(&self, depth: usize) -> Result<()> {
        within("Schema depth", depth, self.max_schema_depth).map_err(|e| match e {
            Error::LimitExceeded(msg) => {
                Error::LimitExceeded(format!("{} (cyclic element references?)", msg))
            }
            other => other,
        })
    }
}

fn within(what: &str, value: usize, max: usize) -> Result<()> {
    if value > max {
        return Err(Error::LimitExceeded(format!(
            "{} {} exceeds maximum {}",
            what, value, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default, permissive) = (Limits::strict(), Limits::new(), Limits::permissive());
        assert!(strict.max_schema_depth < default.max_schema_depth);
        assert!(default.max_schema_depth < permissive.max_schema_depth);
        assert!(strict.max_xml_size < default.max_xml_size);
        assert_eq!(default, Limits::default());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = Limits::strict();
        assert!(limits.check_schema_depth(20).is_ok());
        assert!(limits.check_xml_depth(100).is_ok());
        assert!(limits.check_attributes(101).is_err());
    }

    #[test]
    fn test_schema_depth_message() {
        let err = Limits::strict().check_schema_depth(21).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert!(err.to_string().contains("cyclic element references"));
    }

    #[test]
    fn test_size_of_a_harvest() {
        let limits = Limits {
            max_xml_size: 4096,
            ..Limits::default()
        };
        assert!(limits.check_xml_size(4096).is_ok());
        assert!(matches!(
            limits.check_xml_size(4097),
            Err(Error::LimitExceeded(_))
        ));
    }
}
