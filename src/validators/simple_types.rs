//! Simple types for leaf element text
//!
//! A small subset of the XSD built-in datatypes plus the restriction facets
//! found in metadata schemas. Built-ins not listed here validate as
//! `anySimpleType`.

use base64::Engine;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Built-in datatypes with a lexical check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    /// xs:anySimpleType and unchecked built-ins
    AnySimple,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:boolean
    Boolean,
    /// xs:integer, xs:int, xs:long, xs:short
    Integer,
    /// xs:nonNegativeInteger, xs:unsignedInt, ...
    NonNegativeInteger,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:decimal
    Decimal,
    /// xs:float, xs:double
    Double,
    /// xs:date
    Date,
    /// xs:dateTime
    DateTime,
    /// xs:anyURI
    AnyUri,
    /// xs:base64Binary
    Base64Binary,
}

impl BuiltinType {
    /// Look up a built-in by local name
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => BuiltinType::String,
            "normalizedString" => BuiltinType::NormalizedString,
            "token" | "language" | "Name" | "NCName" | "NMTOKEN" => BuiltinType::Token,
            "boolean" => BuiltinType::Boolean,
            "integer" | "int" | "long" | "short" | "byte" => BuiltinType::Integer,
            "nonNegativeInteger" | "unsignedLong" | "unsignedInt" | "unsignedShort"
            | "unsignedByte" => BuiltinType::NonNegativeInteger,
            "positiveInteger" => BuiltinType::PositiveInteger,
            "decimal" => BuiltinType::Decimal,
            "float" | "double" => BuiltinType::Double,
            "date" => BuiltinType::Date,
            "dateTime" => BuiltinType::DateTime,
            "anyURI" => BuiltinType::AnyUri,
            "base64Binary" => BuiltinType::Base64Binary,
            _ => BuiltinType::AnySimple,
        }
    }

    /// Whitespace is kept as is (otherwise collapsed before checking)
    fn preserves_whitespace(self) -> bool {
        matches!(self, BuiltinType::String | BuiltinType::AnySimple)
    }

    /// Check the lexical form of a value
    pub fn validate(self, value: &str) -> Result<(), String> {
        let ok = match self {
            BuiltinType::AnySimple
            | BuiltinType::String
            | BuiltinType::NormalizedString
            | BuiltinType::Token => true,
            BuiltinType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            BuiltinType::Integer => value.parse::<i64>().is_ok(),
            BuiltinType::NonNegativeInteger => value.parse::<u64>().is_ok(),
            BuiltinType::PositiveInteger => value.parse::<u64>().map_or(false, |n| n > 0),
            BuiltinType::Decimal => Decimal::from_str(value).is_ok(),
            BuiltinType::Double => {
                matches!(value, "INF" | "-INF" | "NaN") || value.parse::<f64>().is_ok()
            }
            BuiltinType::Date => {
                chrono::NaiveDate::parse_from_str(strip_timezone(value), "%Y-%m-%d").is_ok()
            }
            BuiltinType::DateTime => {
                chrono::DateTime::parse_from_rfc3339(value).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                        .is_ok()
            }
            BuiltinType::AnyUri => {
                // Relative references are valid; only absolute ones are parsed
                !value.contains(':') || url::Url::parse(value).is_ok()
            }
            BuiltinType::Base64Binary => {
                let compact: String = value.split_whitespace().collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .is_ok()
            }
        };

        if ok {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {:?} value", value, self))
        }
    }
}

fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    // Trailing +hh:mm / -hh:mm after a full date
    if value.len() > 10 && value.is_char_boundary(10) {
        let (date, zone) = value.split_at(10);
        if zone.starts_with(['+', '-']) {
            return date;
        }
    }
    value
}

/// Restriction facet
#[derive(Debug, Clone)]
pub enum Facet {
    /// Value must be one of the listed strings
    Enumeration(Vec<String>),
    /// Value must match the whole pattern
    Pattern {
        /// Pattern as written in the schema
        source: String,
        /// Anchored compiled form
        regex: Regex,
    },
    /// Minimum length in characters
    MinLength(usize),
    /// Maximum length in characters
    MaxLength(usize),
    /// Inclusive numeric lower bound
    MinInclusive(Decimal),
    /// Inclusive numeric upper bound
    MaxInclusive(Decimal),
}

impl Facet {
    /// Build a pattern facet; XSD patterns match the entire value
    pub fn pattern(source: &str) -> Result<Self, String> {
        let regex = Regex::new(&format!("^(?:{})$", source))
            .map_err(|e| format!("Invalid pattern '{}': {}", source, e))?;
        Ok(Facet::Pattern {
            source: source.to_string(),
            regex,
        })
    }

    /// Check a value against this facet
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match self {
            Facet::Enumeration(values) => {
                if values.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' is not in the enumeration {:?}",
                        value, values
                    ))
                }
            }
            Facet::Pattern { source, regex } => {
                if regex.is_match(value) {
                    Ok(())
                } else {
                    Err(format!("'{}' does not match pattern '{}'", value, source))
                }
            }
            Facet::MinLength(min) => {
                if value.chars().count() >= *min {
                    Ok(())
                } else {
                    Err(format!("'{}' is shorter than {} characters", value, min))
                }
            }
            Facet::MaxLength(max) => {
                if value.chars().count() <= *max {
                    Ok(())
                } else {
                    Err(format!("'{}' is longer than {} characters", value, max))
                }
            }
            Facet::MinInclusive(min) => match Decimal::from_str(value) {
                Ok(number) if number >= *min => Ok(()),
                _ => Err(format!("'{}' is less than {}", value, min)),
            },
            Facet::MaxInclusive(max) => match Decimal::from_str(value) {
                Ok(number) if number <= *max => Ok(()),
                _ => Err(format!("'{}' is greater than {}", value, max)),
            },
        }
    }
}

/// A built-in type narrowed by facets
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Built-in the restriction chain ends in
    pub base: BuiltinType,
    /// Facets from every restriction step
    pub facets: Vec<Facet>,
}

impl SimpleType {
    /// Unrestricted built-in
    pub fn builtin(base: BuiltinType) -> Self {
        Self {
            base,
            facets: Vec::new(),
        }
    }

    /// Add a facet
    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// Check a text value
    pub fn validate_value(&self, text: &str) -> Result<(), String> {
        let collapsed;
        let value = if self.base.preserves_whitespace() {
            text
        } else {
            collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            collapsed.as_str()
        };

        self.base.validate(value)?;
        for facet in &self.facets {
            facet.validate(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(BuiltinType::from_name("string"), BuiltinType::String);
        assert_eq!(BuiltinType::from_name("unsignedInt"), BuiltinType::NonNegativeInteger);
        assert_eq!(BuiltinType::from_name("gYear"), BuiltinType::AnySimple);
    }

    #[test]
    fn test_builtin_values() {
        assert!(BuiltinType::Integer.validate("-12").is_ok());
        assert!(BuiltinType::Integer.validate("1.5").is_err());
        assert!(BuiltinType::PositiveInteger.validate("0").is_err());
        assert!(BuiltinType::Decimal.validate("-89.5").is_ok());
        assert!(BuiltinType::Decimal.validate("north").is_err());
        assert!(BuiltinType::Boolean.validate("yes").is_err());
        assert!(BuiltinType::Double.validate("INF").is_ok());
    }

    #[test]
    fn test_dates() {
        assert!(BuiltinType::Date.validate("2012-02-29").is_ok());
        assert!(BuiltinType::Date.validate("2012-02-29Z").is_ok());
        assert!(BuiltinType::Date.validate("2012-02-29+01:00").is_ok());
        assert!(BuiltinType::Date.validate("2011-02-29").is_err());
        assert!(BuiltinType::DateTime.validate("2012-02-29T10:00:00Z").is_ok());
        assert!(BuiltinType::DateTime.validate("2012-02-29T10:00:00").is_ok());
        assert!(BuiltinType::DateTime.validate("2012-02-29").is_err());
    }

    #[test]
    fn test_uri_and_base64() {
        assert!(BuiltinType::AnyUri.validate("http://gcmd.nasa.gov/").is_ok());
        assert!(BuiltinType::AnyUri.validate("relative/path").is_ok());
        assert!(BuiltinType::Base64Binary.validate("aGVsbG8=").is_ok());
        assert!(BuiltinType::Base64Binary.validate("not base64!").is_err());
    }

    #[test]
    fn test_facets() {
        let progress = SimpleType::builtin(BuiltinType::String).with_facet(Facet::Enumeration(
            vec!["Planned".into(), "In Work".into(), "Complete".into()],
        ));
        assert!(progress.validate_value("In Work").is_ok());
        assert!(progress.validate_value("Done").is_err());

        let id = SimpleType::builtin(BuiltinType::String)
            .with_facet(Facet::pattern(r"[A-Za-z0-9_\-\.]+").unwrap())
            .with_facet(Facet::MaxLength(8));
        assert!(id.validate_value("NP_1.2").is_ok());
        assert!(id.validate_value("has space").is_err());
        assert!(id.validate_value("much_too_long").is_err());

        let latitude = SimpleType::builtin(BuiltinType::Decimal)
            .with_facet(Facet::MinInclusive(Decimal::from(-90)))
            .with_facet(Facet::MaxInclusive(Decimal::from(90)));
        assert!(latitude.validate_value(" -90.0 ").is_ok());
        assert!(latitude.validate_value("91").is_err());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let facet = Facet::pattern(r"\d{4}").unwrap();
        assert!(facet.validate("2012").is_ok());
        assert!(facet.validate("x2012x").is_err());
        assert!(Facet::pattern("(").is_err());
    }
}
