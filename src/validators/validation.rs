//! Validation records and context
//!
//! Problems found while validating an instance document are collected, not
//! raised. Each one is tagged with the record it was found in so that
//! documents carrying many records can be triaged.

use serde::Serialize;
use std::fmt;

use crate::documents::Element;

/// One problem found in an instance document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRecord {
    /// 1-based position of the record holding the problem; 0 when the
    /// document contains no record at all
    pub record: usize,
    /// Local name of the offending (or missing) element
    pub element: String,
    /// Human readable description
    pub message: String,
    /// Line of the element the problem was found at
    pub line: usize,
}

impl fmt::Display for ValidationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {}, line {}: element '{}': {}",
            self.record, self.line, self.element, self.message
        )
    }
}

/// State carried through one validation run
#[derive(Debug, Default)]
pub struct ValidationContext {
    /// Collected problems
    pub errors: Vec<ValidationRecord>,
    /// Record currently being validated (1-based)
    pub record: usize,
    /// Current nesting level
    pub level: usize,
    /// Maximum depth for validation (None = unlimited)
    pub max_depth: Option<usize>,
}

impl ValidationContext {
    /// Create a new validation context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Start validating the record at `position` (1-based)
    pub fn begin_record(&mut self, position: usize) {
        self.record = position;
        self.level = 0;
    }

    /// Check if we've exceeded max depth
    pub fn is_max_depth_exceeded(&self) -> bool {
        self.max_depth.map_or(false, |max| self.level >= max)
    }

    /// Enter a new level
    pub fn enter_level(&mut self) {
        self.level += 1;
    }

    /// Exit current level
    pub fn exit_level(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Record a problem about `element`
    pub fn error(&mut self, element: &str, line: usize, message: impl Into<String>) {
        self.errors.push(ValidationRecord {
            record: self.record,
            element: element.to_string(),
            message: message.into(),
            line,
        });
    }

    /// Record a problem located at an instance element
    pub fn error_at(&mut self, elem: &Element, message: impl Into<String>) {
        self.error(elem.local_name(), elem.line, message);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take the collected records
    pub fn into_errors(self) -> Vec<ValidationRecord> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_carry_record() {
        let mut context = ValidationContext::new();
        context.begin_record(2);
        context.error("Entry_ID", 14, "bad value");

        assert!(context.has_errors());
        let errors = context.into_errors();
        assert_eq!(errors[0].record, 2);
        assert_eq!(
            errors[0].to_string(),
            "record 2, line 14: element 'Entry_ID': bad value"
        );
    }

    #[test]
    fn test_levels() {
        let mut context = ValidationContext::new().with_max_depth(1);
        assert!(!context.is_max_depth_exceeded());
        context.enter_level();
        assert!(context.is_max_depth_exceeded());
        context.exit_level();
        context.exit_level();
        assert_eq!(context.level, 0);
    }

    #[test]
    fn test_record_serializes() {
        let record = ValidationRecord {
            record: 1,
            element: "Entry_Title".to_string(),
            message: "missing".to_string(),
            line: 3,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["element"], "Entry_Title");
        assert_eq!(json["record"], 1);
    }
}
