//! Schema introspection and instance validation
//!
//! The introspection side ([`Schema`]) walks element declarations through
//! the [`ElementDecl`] abstraction and derives descriptors and templates.
//! The validation side compiles the same source into a [`CompiledSchema`]
//! and checks instance documents record by record.

pub mod document_validation;
pub mod elements;
pub mod models;
pub mod particles;
pub mod schemas;
pub mod simple_types;
pub mod templates;
pub mod validation;

// Re-exports
pub use document_validation::validate_document;
pub use elements::ElementDecl;
pub use models::CompiledSchema;
pub use particles::{Occurs, UNBOUNDED};
pub use schemas::{Schema, SchemaConfig, DEFAULT_SCHEMA};
pub use simple_types::{BuiltinType, Facet, SimpleType};
pub use templates::{generate_structure, ElementInfo, InfoMap, Template, TemplateMap};
pub use validation::{ValidationContext, ValidationRecord};
