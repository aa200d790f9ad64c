//! Schema introspection
//!
//! [`Schema`] wraps a parsed XSD document and answers structural questions
//! about it: which elements are roots or children, which are required or
//! repeatable, and what an empty instance looks like ([`Schema::hash_template`]).
//! Validation of instance documents goes through a [`CompiledSchema`] that is
//! built from the same source on first use.
//!
//! Element names are assumed to be unique across the schema; the first
//! declaration or reference met during the walk describes the name.
//! Cyclic element references are not supported: the walk stops with
//! [`Error::LimitExceeded`] once `Limits::max_schema_depth` is reached.
//!
//! A `Schema` is not `Sync`: the compiled validator is memoized in a
//! single-threaded cell.

use once_cell::unsync::OnceCell;

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::is_remote;

use super::document_validation::validate_document;
use super::elements::ElementDecl;
use super::models::CompiledSchema;
use super::templates::{generate_structure, ElementInfo, InfoMap, TemplateMap};
use super::validation::ValidationRecord;

/// The DIF schema bundled with the crate
pub const DEFAULT_SCHEMA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/dif_v9.8.4.xsd");

/// Schema loading configuration
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    /// Schema source: file path, markup or URI
    pub source: String,
    /// Limits for loading and walking the schema
    pub limits: Limits,
    /// Whether remote sources may be fetched
    pub allow_remote: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SCHEMA.to_string(),
            limits: Limits::default(),
            allow_remote: true,
        }
    }
}

impl SchemaConfig {
    /// Configuration for a given source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote sources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    fn loader(&self) -> Loader {
        Loader::new()
            .with_limits(self.limits.clone())
            .with_allow_remote(self.allow_remote)
    }
}

/// Introspector over an XSD document
#[derive(Debug)]
pub struct Schema {
    config: SchemaConfig,
    document: Document,
    compiled: OnceCell<CompiledSchema>,
}

impl Schema {
    /// Load the schema named by `config`
    pub fn new(config: SchemaConfig) -> Result<Self> {
        let document = config
            .loader()
            .load_xml(&config.source, false)?
            .ok_or(Error::InvalidSource)?;

        match document.root() {
            Some(root) if root.local_name() == "schema" => {}
            _ => {
                return Err(
                    ParseError::new("Document is not an XML Schema (no xs:schema root)").into(),
                )
            }
        }

        tracing::debug!(
            globals = document.root().map_or(0, |root| root.children.len()),
            "loaded schema"
        );

        Ok(Self {
            config,
            document,
            compiled: OnceCell::new(),
        })
    }

    /// Load a schema from a path, markup or URI
    pub fn from_source(source: &str) -> Result<Self> {
        Self::new(SchemaConfig::new(source))
    }

    /// Load the bundled DIF schema
    pub fn default_schema() -> Result<Self> {
        Self::new(SchemaConfig::default())
    }

    /// The configuration this schema was loaded with
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// The parsed schema document
    pub fn document(&self) -> &Document {
        &self.document
    }

    fn schema_root(&self) -> &Element {
        // Checked in the constructor
        &self.document.elements[0]
    }

    fn global_declarations(&self) -> impl Iterator<Item = &Element> {
        self.schema_root()
            .children
            .iter()
            .filter(|child| child.local_name() == "element" && child.name().is_some())
    }

    /// Names of the top-level element declarations in document order
    pub fn global_elements(&self) -> Vec<&str> {
        self.global_declarations().filter_map(|e| e.name()).collect()
    }

    /// URL of the published schema this document stands for.
    ///
    /// Taken from the first absolute `schemaLocation` on an `xs:import`,
    /// `xs:include` or `xs:redefine`, falling back to the location half of
    /// an `xsi:schemaLocation` (or `xsi:noNamespaceSchemaLocation`) on the
    /// schema element.
    pub fn schema_location(&self) -> Option<String> {
        let root = self.schema_root();

        let linked = root
            .children
            .iter()
            .filter(|child| matches!(child.local_name(), "import" | "include" | "redefine"))
            .filter_map(|child| child.get_attribute("schemaLocation"))
            .find(|location| is_remote(location));
        if let Some(location) = linked {
            return Some(location.to_string());
        }

        if let Some(hints) = root.get_attribute("schemaLocation") {
            let tokens: Vec<&str> = hints.split_whitespace().collect();
            if let Some(location) = tokens.chunks(2).find_map(|pair| pair.get(1)) {
                return Some(location.to_string());
            }
        }

        root.get_attribute("noNamespaceSchemaLocation")
            .map(str::to_string)
    }

    /// Top-level declaration of `name`, or the first local declaration
    fn declaration(&self, name: &str) -> Option<&Element> {
        self.global_declarations()
            .find(|decl| decl.name() == Some(name))
            .or_else(|| {
                self.schema_root()
                    .descendants()
                    .into_iter()
                    .find(|node| node.local_name() == "element" && node.name() == Some(name))
            })
    }

    /// Follow a `ref` to the declaration it names
    fn resolve<'a>(&'a self, node: &'a Element) -> Result<&'a Element> {
        match node.reference() {
            Some(reference) => self.declaration(reference).ok_or_else(|| {
                Error::Key(format!(
                    "Element reference '{}' at line {} has no declaration",
                    reference, node.line
                ))
            }),
            None => Ok(node),
        }
    }

    fn nested<'a>(&'a self, decl: &'a Element) -> Vec<&'a Element> {
        let mut nested = decl.declarations();
        if nested.is_empty() {
            if let Some(type_name) = decl.type_name() {
                let local = super::elements::strip_prefix(type_name);
                if let Some(named) = self.schema_root().children.iter().find(|child| {
                    child.local_name() == "complexType" && child.get_attribute("name") == Some(local)
                }) {
                    super::elements::collect_declarations(named, &mut nested);
                }
            }
        }
        nested
    }

    /// The named element's declaration has nested element declarations
    pub fn has_children(&self, name: &str) -> bool {
        self.declaration(name)
            .map_or(false, |decl| !self.nested(decl).is_empty())
    }

    /// The named element is referenced or declared inside another element
    pub fn is_child(&self, name: &str) -> bool {
        self.schema_root().children.iter().any(|global| {
            global
                .descendants()
                .into_iter()
                .any(|node| node.local_name() == "element" && node.declared_name() == Some(name))
        })
    }

    /// The named element is declared at the top level and never used as a child
    pub fn is_root(&self, name: &str) -> bool {
        self.global_declarations().any(|decl| decl.name() == Some(name)) && !self.is_child(name)
    }

    /// Name of the first root element in document order
    pub fn root(&self) -> Result<&str> {
        self.global_declarations()
            .filter_map(|decl| decl.name())
            .find(|name| self.is_root(name))
            .ok_or_else(|| Error::Key("Schema declares no root element".to_string()))
    }

    /// `maxOccurs` of an element node is `unbounded`
    pub fn is_unbounded(node: &impl ElementDecl) -> bool {
        node.is_unbounded()
    }

    /// `minOccurs` of an element node is absent or at least 1
    pub fn is_required(node: &impl ElementDecl) -> bool {
        node.is_required()
    }

    fn describe(&self, occurrence: &Element, depth: usize) -> Result<ElementInfo> {
        self.config.limits.check_schema_depth(depth)?;

        let info = ElementInfo::new(occurrence.is_required(), occurrence.is_unbounded());
        let nested = self.nested(self.resolve(occurrence)?);
        if nested.is_empty() {
            return Ok(info);
        }

        let mut children = InfoMap::new();
        for node in nested {
            let Some(name) = node.declared_name() else {
                continue;
            };
            if !children.contains_key(name) {
                children.insert(name.to_string(), self.describe(node, depth + 1)?);
            }
        }
        Ok(info.with_children(children))
    }

    fn collect(&self, occurrence: &Element, depth: usize, info: &mut InfoMap) -> Result<()> {
        let Some(name) = occurrence.declared_name() else {
            return Ok(());
        };
        if info.contains_key(name) {
            return Ok(());
        }

        info.insert(name.to_string(), self.describe(occurrence, depth)?);
        for node in self.nested(self.resolve(occurrence)?) {
            self.collect(node, depth + 1, info)?;
        }
        Ok(())
    }

    /// Descriptor of every element, keyed by name.
    ///
    /// The walk starts at [`root`](Self::root) and visits everything reachable
    /// from it, then picks up top-level declarations no root reaches.
    pub fn info(&self) -> Result<InfoMap> {
        let mut info = InfoMap::new();

        let root = self.root()?;
        if let Some(decl) = self.declaration(root) {
            self.collect(decl, 0, &mut info)?;
        }
        for decl in self.global_declarations() {
            self.collect(decl, 0, &mut info)?;
        }

        Ok(info)
    }

    /// Empty placeholder for every element in [`info`](Self::info)
    pub fn hash_template(&self) -> Result<TemplateMap> {
        Ok(self
            .info()?
            .iter()
            .map(|(name, info)| (name.clone(), generate_structure(info)))
            .collect())
    }

    /// [`hash_template`](Self::hash_template) rendered as JSON
    pub fn template_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Object(
            self.hash_template()?
                .iter()
                .map(|(name, template)| (name.clone(), template.to_json()))
                .collect(),
        ))
    }

    /// Names of the repeatable elements, in walk order
    pub fn generate_unbounded(&self) -> Result<Vec<String>> {
        Ok(self
            .info()?
            .into_iter()
            .filter(|(_, info)| info.unbounded)
            .map(|(name, _)| name)
            .collect())
    }

    /// The validator for this schema, compiled on first use.
    ///
    /// The source is loaded a second time from the configured location.
    pub fn compiled_schema(&self) -> Result<&CompiledSchema> {
        self.compiled.get_or_try_init(|| {
            tracing::debug!("compiling schema for validation");
            let document = self
                .config
                .loader()
                .load_xml(&self.config.source, false)?
                .ok_or(Error::InvalidSource)?;
            CompiledSchema::compile(&document)
        })
    }

    /// Validate an instance document.
    ///
    /// Returns one record per problem; an empty list means the document is
    /// valid. Fails with [`Error::MissingDocument`] when no document is given.
    pub fn validate_xml(&self, document: Option<&Document>) -> Result<Vec<ValidationRecord>> {
        let document = document.ok_or(Error::MissingDocument)?;
        validate_document(self.compiled_schema()?, document, self.root()?)
    }

    /// Check if an instance document is valid
    pub fn is_valid(&self, document: &Document) -> Result<bool> {
        Ok(self.validate_xml(Some(document))?.is_empty())
    }
}
