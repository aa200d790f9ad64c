//! Compiled schema content models
//!
//! The schema tree is compiled once into global element declarations, named
//! types and model groups. [`validate_document`](super::document_validation::validate_document)
//! then checks instance elements against them.
//!
//! Supported: `xs:sequence`, `xs:choice` and `xs:all` with occurrence bounds,
//! `ref` and local element declarations, `type` references, `mixed`
//! content, `xs:simpleContent` and simple type restrictions. Included or
//! imported schemas are not fetched, attributes are not checked, and a type
//! that cannot be resolved accepts any content.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::XSD_NAMESPACE;

use super::elements::{strip_prefix, ElementDecl};
use super::particles::{parse_occurs, Occurs};
use super::simple_types::{BuiltinType, Facet, SimpleType};

/// Restriction chains deeper than this are treated as cyclic
const MAX_TYPE_DEPTH: usize = 32;

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    /// Children in declaration order
    Sequence,
    /// Exactly one of the particles
    Choice,
    /// Each particle at most once, any order
    All,
}

/// A model group with its occurrence bounds
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Compositor
    pub compositor: Compositor,
    /// Occurrence bounds of the group itself
    pub occurs: Occurs,
    /// Particles in declaration order
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Check if an element named `name` can start this group
    pub fn accepts(&self, name: &str) -> bool {
        self.particles.iter().any(|p| p.accepts(name))
    }

    /// Local names of the elements this group can start with
    pub fn expected(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for particle in &self.particles {
            match particle {
                Particle::Element { target, .. } => names.push(target.name()),
                Particle::Group(group) => names.extend(group.expected()),
                Particle::Any(_) => names.push("*"),
            }
        }
        names
    }
}

/// Item of a model group
#[derive(Debug, Clone)]
pub enum Particle {
    /// Element reference or local declaration
    Element {
        /// Declaration the particle points at
        target: ElementTarget,
        /// minOccurs / maxOccurs
        occurs: Occurs,
    },
    /// Nested group
    Group(ModelGroup),
    /// `xs:any` wildcard
    Any(Occurs),
}

impl Particle {
    /// Check if an element named `name` matches this particle
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Particle::Element { target, .. } => target.name() == name,
            Particle::Group(group) => group.accepts(name),
            Particle::Any(_) => true,
        }
    }

    /// Occurrence bounds
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element { occurs, .. } | Particle::Any(occurs) => *occurs,
            Particle::Group(group) => group.occurs,
        }
    }
}

/// What an element particle refers to
#[derive(Debug, Clone)]
pub enum ElementTarget {
    /// `ref` to a global declaration
    Ref(String),
    /// Declaration nested in the group
    Local(Box<ElementDeclaration>),
}

impl ElementTarget {
    /// Local name of the element
    pub fn name(&self) -> &str {
        match self {
            ElementTarget::Ref(name) => name,
            ElementTarget::Local(decl) => &decl.name,
        }
    }
}

/// Compiled element declaration
#[derive(Debug, Clone)]
pub struct ElementDeclaration {
    /// Local name
    pub name: String,
    /// Namespace the instance element must be in; `None` for unqualified locals
    pub namespace: Option<String>,
    /// Allowed content
    pub content: ContentType,
    /// Line of the declaration in the schema
    pub line: usize,
}

/// Content allowed inside an element
#[derive(Debug, Clone)]
pub enum ContentType {
    /// Text only
    Simple(SimpleType),
    /// Child elements, optionally interleaved with text
    Complex {
        /// Text allowed between children
        mixed: bool,
        /// Content model; `None` for empty content
        model: Option<ModelGroup>,
    },
    /// Reference to a named type, resolved at validation time
    Named(String),
    /// Anything (xs:anyType or unsupported constructs)
    Any,
}

/// Schema compiled for validation
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// targetNamespace of the schema
    pub target_namespace: Option<String>,
    elements: IndexMap<String, ElementDeclaration>,
    types: IndexMap<String, ContentType>,
}

impl CompiledSchema {
    /// Compile a parsed schema document
    pub fn compile(doc: &Document) -> Result<Self> {
        let root = doc
            .root()
            .filter(|root| root.local_name() == "schema")
            .ok_or_else(|| ParseError::new("Document is not an XML Schema (no xs:schema root)"))?;

        let compiler = Compiler::new(root);
        let mut schema = CompiledSchema {
            target_namespace: root.get_attribute("targetNamespace").map(str::to_string),
            elements: IndexMap::new(),
            types: IndexMap::new(),
        };

        for child in &root.children {
            match child.local_name() {
                "element" => {
                    let decl = compiler.declaration(child, true)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let name = required_name(child)?;
                    let content = compiler.complex_type(child)?;
                    schema.types.insert(name.to_string(), content);
                }
                "simpleType" => {
                    let name = required_name(child)?;
                    let simple = compiler.simple_type(child, 0)?;
                    schema
                        .types
                        .insert(name.to_string(), ContentType::Simple(simple));
                }
                "import" | "include" | "redefine" => {
                    tracing::debug!(
                        location = child.get_attribute("schemaLocation"),
                        "not following {}",
                        child.local_name()
                    );
                }
                _ => {}
            }
        }

        tracing::debug!(
            elements = schema.elements.len(),
            types = schema.types.len(),
            "compiled schema"
        );

        Ok(schema)
    }

    /// Global element declaration by local name
    pub fn element(&self, name: &str) -> Option<&ElementDeclaration> {
        self.elements.get(name)
    }

    /// Global element declarations in document order
    pub fn elements(&self) -> impl Iterator<Item = &ElementDeclaration> {
        self.elements.values()
    }

    /// Named type by local name
    pub fn named_type(&self, name: &str) -> Option<&ContentType> {
        self.types.get(name)
    }
}

fn required_name(node: &Element) -> Result<&str> {
    node.get_attribute("name").ok_or_else(|| {
        ParseError::new(format!("Global {} without a name", node.local_name()))
            .with_line(node.line)
            .into()
    })
}

/// Attach the schema node a parse error came from
fn locate(err: Error, node: &Element) -> Error {
    match err {
        Error::Parse(mut parse) => {
            if parse.element.is_none() {
                if let Some(name) = node.declared_name() {
                    parse = parse.with_element(name);
                }
            }
            if parse.line.is_none() {
                parse = parse.with_line(node.line);
            }
            Error::Parse(parse)
        }
        other => other,
    }
}

struct Compiler<'a> {
    /// Prefixes bound to the XSD namespace; `""` when it is the default
    xsd_prefixes: Vec<&'a str>,
    /// Named simple types, for restriction bases
    simple_types: IndexMap<&'a str, &'a Element>,
    target_namespace: Option<&'a str>,
    /// `elementFormDefault="qualified"`
    qualified_locals: bool,
}

impl<'a> Compiler<'a> {
    fn new(root: &'a Element) -> Self {
        let xsd_prefixes = root
            .namespaces
            .iter()
            .filter(|(_, uri)| uri.as_str() == XSD_NAMESPACE)
            .map(|(prefix, _)| prefix.as_str())
            .collect();

        let simple_types = root
            .children
            .iter()
            .filter(|child| child.local_name() == "simpleType")
            .filter_map(|child| child.get_attribute("name").map(|name| (name, child)))
            .collect();

        Self {
            xsd_prefixes,
            simple_types,
            target_namespace: root.get_attribute("targetNamespace"),
            qualified_locals: root.get_attribute("elementFormDefault") == Some("qualified"),
        }
    }

    fn is_xsd(&self, qname: &str) -> bool {
        let prefix = qname.split_once(':').map_or("", |(prefix, _)| prefix);
        self.xsd_prefixes.contains(&prefix)
    }

    /// Globals are always in the target namespace; locals follow `form`,
    /// then `elementFormDefault`
    fn declaration(&self, node: &Element, global: bool) -> Result<ElementDeclaration> {
        let name = node.name().ok_or_else(|| {
            ParseError::new("Element declaration without a name")
                .with_line(node.line)
        })?;

        let content = self.content(node).map_err(|e| locate(e, node))?;

        let qualified = global
            || match node.get_attribute("form") {
                Some(form) => form == "qualified",
                None => self.qualified_locals,
            };

        Ok(ElementDeclaration {
            name: name.to_string(),
            namespace: self.target_namespace.filter(|_| qualified).map(str::to_string),
            content,
            line: node.line,
        })
    }

    fn content(&self, node: &Element) -> Result<ContentType> {
        if let Some(type_name) = node.type_name() {
            return Ok(self.type_reference(type_name));
        }
        if let Some(complex) = node.find_child("complexType") {
            return self.complex_type(complex);
        }
        if let Some(simple) = node.find_child("simpleType") {
            return Ok(ContentType::Simple(self.simple_type(simple, 0)?));
        }
        Ok(ContentType::Any)
    }

    fn type_reference(&self, type_name: &str) -> ContentType {
        let local = strip_prefix(type_name);
        if !self.is_xsd(type_name) {
            return ContentType::Named(local.to_string());
        }
        if local == "anyType" {
            ContentType::Any
        } else {
            ContentType::Simple(SimpleType::builtin(BuiltinType::from_name(local)))
        }
    }

    fn complex_type(&self, node: &Element) -> Result<ContentType> {
        let mixed = matches!(node.get_attribute("mixed"), Some("true") | Some("1"));

        for child in &node.children {
            match child.local_name() {
                "sequence" | "choice" | "all" => {
                    return Ok(ContentType::Complex {
                        mixed,
                        model: Some(self.group(child)?),
                    });
                }
                "simpleContent" => {
                    let base = child
                        .children
                        .iter()
                        .find_map(|derivation| derivation.get_attribute("base"));
                    return Ok(base.map_or(ContentType::Any, |b| self.type_reference(b)));
                }
                "complexContent" | "group" => {
                    tracing::debug!(line = child.line, "{} accepted as any content", child.local_name());
                    return Ok(ContentType::Any);
                }
                _ => {}
            }
        }

        Ok(ContentType::Complex { mixed, model: None })
    }

    fn group(&self, node: &Element) -> Result<ModelGroup> {
        let compositor = match node.local_name() {
            "choice" => Compositor::Choice,
            "all" => Compositor::All,
            _ => Compositor::Sequence,
        };
        let occurs = parse_occurs(node.min_occurs(), node.max_occurs())
            .map_err(|e| locate(e, node))?;

        let mut particles = Vec::new();
        for child in &node.children {
            match child.local_name() {
                "element" => {
                    let occurs = parse_occurs(child.min_occurs(), child.max_occurs())
                        .map_err(|e| locate(e, child))?;
                    let target = match child.reference() {
                        Some(reference) => ElementTarget::Ref(reference.to_string()),
                        None => ElementTarget::Local(Box::new(self.declaration(child, false)?)),
                    };
                    particles.push(Particle::Element { target, occurs });
                }
                "sequence" | "choice" | "all" => particles.push(Particle::Group(self.group(child)?)),
                "any" => {
                    let occurs = parse_occurs(child.min_occurs(), child.max_occurs())
                        .map_err(|e| locate(e, child))?;
                    particles.push(Particle::Any(occurs));
                }
                _ => {}
            }
        }

        Ok(ModelGroup {
            compositor,
            occurs,
            particles,
        })
    }

    fn simple_type(&self, node: &Element, depth: usize) -> Result<SimpleType> {
        if depth > MAX_TYPE_DEPTH {
            return Err(ParseError::new("Simple type restriction chain is cyclic")
                .with_line(node.line)
                .into());
        }

        let Some(restriction) = node.find_child("restriction") else {
            // xs:list and xs:union
            return Ok(SimpleType::builtin(BuiltinType::AnySimple));
        };

        let mut simple = match restriction.get_attribute("base") {
            Some(base) if self.is_xsd(base) => {
                SimpleType::builtin(BuiltinType::from_name(strip_prefix(base)))
            }
            Some(base) => match self.simple_types.get(strip_prefix(base)) {
                Some(named) => self.simple_type(named, depth + 1)?,
                None => SimpleType::builtin(BuiltinType::AnySimple),
            },
            None => match restriction.find_child("simpleType") {
                Some(inline) => self.simple_type(inline, depth + 1)?,
                None => SimpleType::builtin(BuiltinType::AnySimple),
            },
        };

        let mut enumeration = Vec::new();
        for facet in &restriction.children {
            let Some(value) = facet.get_attribute("value") else {
                continue;
            };
            let invalid = || {
                Error::from(
                    ParseError::new(format!("Invalid {} facet value '{}'", facet.local_name(), value))
                        .with_line(facet.line),
                )
            };
            match facet.local_name() {
                "enumeration" => enumeration.push(value.to_string()),
                "pattern" => {
                    let pattern = Facet::pattern(value)
                        .map_err(|e| Error::from(ParseError::new(e).with_line(facet.line)))?;
                    simple = simple.with_facet(pattern);
                }
                "length" => {
                    let length: usize = value.parse().map_err(|_| invalid())?;
                    simple = simple
                        .with_facet(Facet::MinLength(length))
                        .with_facet(Facet::MaxLength(length));
                }
                "minLength" => {
                    simple = simple.with_facet(Facet::MinLength(value.parse().map_err(|_| invalid())?));
                }
                "maxLength" => {
                    simple = simple.with_facet(Facet::MaxLength(value.parse().map_err(|_| invalid())?));
                }
                "minInclusive" => {
                    let bound = Decimal::from_str(value).map_err(|_| invalid())?;
                    simple = simple.with_facet(Facet::MinInclusive(bound));
                }
                "maxInclusive" => {
                    let bound = Decimal::from_str(value).map_err(|_| invalid())?;
                    simple = simple.with_facet(Facet::MaxInclusive(bound));
                }
                _ => {}
            }
        }
        if !enumeration.is_empty() {
            simple = simple.with_facet(Facet::Enumeration(enumeration));
        }

        Ok(simple)
    }
}
