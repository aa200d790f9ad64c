//! Occurrence bounds for element declarations and model groups
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#p

use crate::error::{ParseError, Result};

/// The `maxOccurs` value meaning "no upper bound"
pub const UNBOUNDED: &str = "unbounded";

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this particle can be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if there is no upper bound
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        match min_str.trim().parse::<u32>() {
            Ok(min) => occurs.min = min,
            Err(_) => {
                return Err(ParseError::new(format!(
                    "minOccurs value '{}' is not a valid non-negative integer",
                    min_str
                ))
                .into())
            }
        }
    }

    if let Some(max_str) = max_occurs {
        if max_str.trim() == UNBOUNDED {
            occurs.max = None;
        } else {
            match max_str.trim().parse::<u32>() {
                Ok(max) => {
                    if occurs.min > max {
                        return Err(ParseError::new(
                            "maxOccurs must be 'unbounded' or greater than minOccurs",
                        )
                        .into());
                    }
                    occurs.max = Some(max);
                }
                Err(_) => {
                    return Err(ParseError::new(format!(
                        "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                        max_str
                    ))
                    .into())
                }
            }
        }
    } else if occurs.min > 1 {
        // Default maxOccurs is 1, but must be >= minOccurs
        return Err(ParseError::new("minOccurs must be lesser or equal than maxOccurs").into());
    }

    Ok(occurs)
}

/// True when a `maxOccurs` value is the literal `unbounded` sentinel
pub fn is_unbounded_value(max_occurs: Option<&str>) -> bool {
    max_occurs.map(str::trim) == Some(UNBOUNDED)
}

/// True when a `minOccurs` value demands at least one occurrence.
///
/// An absent attribute defaults to 1. Values that are not integers are not
/// considered required.
pub fn is_required_value(min_occurs: Option<&str>) -> bool {
    match min_occurs {
        None => true,
        Some(value) => value.trim().parse::<u32>().map_or(false, |min| min >= 1),
    }
}
