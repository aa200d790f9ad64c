//! # difschema
//!
//! Introspection of DIF (Directory Interchange Format) XML Schemas and
//! validation of DIF metadata records.
//!
//! ## Features
//!
//! - Loading XML from a file path, literal markup or an `http(s)://` URI
//! - Classification of schema elements (root, child, required, repeatable)
//! - Per-element descriptors and empty instance templates
//! - Validation of documents holding one or many concatenated records,
//!   with problems attributed to the record they were found in
//! - Protection against oversized or deeply nested input
//!
//! ## Example
//!
//! ```rust,ignore
//! use difschema::{load_xml, Schema};
//!
//! // The bundled DIF schema
//! let schema = Schema::default_schema()?;
//! assert_eq!(schema.root()?, "DIF");
//!
//! // Empty skeleton of a record
//! let template = schema.template_json()?;
//!
//! // Validate a harvested batch
//! let document = load_xml("records.xml", false)?;
//! for problem in schema.validate_xml(document.as_ref())? {
//!     println!("{}", problem);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Resource loading
pub mod locations;
pub mod loaders;
pub mod documents;

// Introspection and validation
pub mod validators;

// Re-exports for convenience
pub use documents::{Document, Element};
pub use error::{Error, ParseError, Result};
pub use limits::Limits;
pub use loaders::{load_xml, Loader};
pub use locations::Location;
pub use validators::{
    generate_structure, ElementInfo, InfoMap, Schema, SchemaConfig, Template, TemplateMap,
    ValidationRecord, DEFAULT_SCHEMA,
};

/// Version of the difschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
