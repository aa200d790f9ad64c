//! Document Validation
//!
//! Validates instance documents against a [`CompiledSchema`]. A document may
//! carry several records (top-level elements named after the schema root,
//! or such elements nested in a wrapper); problems are attributed to the
//! record they occur in.

use crate::documents::{Document, Element};
use crate::error::{Error, Result};

use super::models::{
    CompiledSchema, Compositor, ContentType, ElementDeclaration, ElementTarget, ModelGroup,
    Particle,
};
use super::validation::{ValidationContext, ValidationRecord};

/// Named type references followed before giving up
const MAX_TYPE_HOPS: usize = 8;

/// Validate every `root` record in `doc`
pub fn validate_document(
    schema: &CompiledSchema,
    doc: &Document,
    root: &str,
) -> Result<Vec<ValidationRecord>> {
    let decl = schema.element(root).ok_or_else(|| {
        Error::Key(format!("No global declaration for root element '{}'", root))
    })?;

    let mut context = ValidationContext::new();
    let records = doc.records(root);

    if records.is_empty() {
        let (found, line) = doc
            .root()
            .map_or(("", 0), |elem| (elem.local_name(), elem.line));
        context.error(
            found,
            line,
            format!("No '{}' record found; document root is '{}'", root, found),
        );
    }

    for (index, record) in records.iter().enumerate() {
        context.begin_record(index + 1);
        validate_element(schema, record, decl, &mut context);
    }

    tracing::debug!(
        records = records.len(),
        errors = context.errors.len(),
        "validated document"
    );

    Ok(context.into_errors())
}

/// Validate an XML element against its declaration
///
/// An element in the wrong namespace is reported once and its content is
/// not checked.
pub fn validate_element<'a>(
    schema: &'a CompiledSchema,
    elem: &'a Element,
    decl: &'a ElementDeclaration,
    context: &mut ValidationContext,
) {
    if elem.namespace() != decl.namespace.as_deref() {
        context.error_at(
            elem,
            format!(
                "Element '{}' is in {}, expected {}",
                elem.local_name(),
                describe_namespace(elem.namespace()),
                describe_namespace(decl.namespace.as_deref())
            ),
        );
        return;
    }

    context.enter_level();
    if !context.is_max_depth_exceeded() {
        validate_content(schema, elem, &decl.content, context, 0);
    }
    context.exit_level();
}

fn describe_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(uri) => format!("namespace '{}'", uri),
        None => "no namespace".to_string(),
    }
}

fn validate_content<'a>(
    schema: &'a CompiledSchema,
    elem: &'a Element,
    content: &'a ContentType,
    context: &mut ValidationContext,
    hops: usize,
) {
    match content {
        ContentType::Any => {}
        ContentType::Named(name) => {
            // Unknown types accept any content
            if let Some(resolved) = schema.named_type(name) {
                if hops < MAX_TYPE_HOPS {
                    validate_content(schema, elem, resolved, context, hops + 1);
                }
            }
        }
        ContentType::Simple(simple_type) => {
            if let Some(child) = elem.children.first() {
                context.error_at(
                    elem,
                    format!(
                        "Element '{}' has simple content but contains child element '{}'",
                        elem.local_name(),
                        child.local_name()
                    ),
                );
                return;
            }

            if let Err(reason) = simple_type.validate_value(elem.text()) {
                context.error_at(
                    elem,
                    format!("Invalid value for element '{}': {}", elem.local_name(), reason),
                );
            }
        }
        ContentType::Complex { mixed, model } => {
            if !mixed && !elem.text().trim().is_empty() {
                context.error_at(
                    elem,
                    format!(
                        "Element '{}' has element-only content but contains text: '{}'",
                        elem.local_name(),
                        elem.text().trim()
                    ),
                );
            }

            match model {
                Some(group) => validate_children(schema, elem, group, context),
                None => {
                    if let Some(child) = elem.children.first() {
                        context.error_at(
                            child,
                            format!(
                                "Element '{}' should have no child elements but contains '{}'",
                                elem.local_name(),
                                child.local_name()
                            ),
                        );
                    }
                }
            }
        }
    }
}

/// Validate element content (children) using the content model
fn validate_children<'a>(
    schema: &'a CompiledSchema,
    elem: &'a Element,
    group: &'a ModelGroup,
    context: &mut ValidationContext,
) {
    let mut matcher = ModelMatcher {
        schema,
        parent: elem,
        position: 0,
        follow: Vec::new(),
    };
    matcher.match_group(group, context);

    for leftover in &elem.children[matcher.position..] {
        matcher.unexpected(leftover, context);
    }
}

/// Greedy walk of a parent's children through a content model.
///
/// A child that no particle can take, here or later, is reported once as
/// unexpected and skipped, so matching carries on with the children after it.
struct ModelMatcher<'a> {
    schema: &'a CompiledSchema,
    parent: &'a Element,
    position: usize,
    /// Particles of the enclosing groups that may still match, innermost last
    follow: Vec<&'a [Particle]>,
}

impl<'a> ModelMatcher<'a> {
    fn peek(&self) -> Option<&'a Element> {
        self.parent.children.get(self.position)
    }

    fn peek_name(&self) -> Option<&'a str> {
        self.peek().map(Element::local_name)
    }

    fn expected_later(&self, name: &str) -> bool {
        self.follow
            .iter()
            .any(|particles| particles.iter().any(|p| p.accepts(name)))
    }

    /// Skip children that neither `accepts` nor a later particle can take
    fn skip_strays(&mut self, accepts: impl Fn(&str) -> bool, context: &mut ValidationContext) {
        while let Some(child) = self.peek() {
            let name = child.local_name();
            if accepts(name) || self.expected_later(name) {
                break;
            }
            self.unexpected(child, context);
            self.position += 1;
        }
    }

    fn match_group(&mut self, group: &'a ModelGroup, context: &mut ValidationContext) {
        let mut count = 0;
        while !group.occurs.is_over(count) {
            self.skip_strays(|name| group.accepts(name), context);

            let enters = self.peek_name().map_or(false, |name| group.accepts(name));
            if !enters && !group.occurs.is_missing(count) {
                break;
            }

            let repeats = !group.occurs.is_over(count + 1);
            if repeats {
                self.follow.push(&group.particles);
            }

            let start = self.position;
            match group.compositor {
                Compositor::Sequence => {
                    for (index, particle) in group.particles.iter().enumerate() {
                        self.follow.push(&group.particles[index + 1..]);
                        self.match_particle(particle, context);
                        self.follow.pop();
                    }
                }
                Compositor::Choice => self.match_choice(group, context),
                Compositor::All => self.match_all(group, context),
            }
            count += 1;

            if repeats {
                self.follow.pop();
            }
            if self.position == start {
                break;
            }
        }
    }

    fn match_choice(&mut self, group: &'a ModelGroup, context: &mut ValidationContext) {
        let chosen = self
            .peek_name()
            .and_then(|name| group.particles.iter().find(|p| p.accepts(name)));

        match chosen {
            Some(particle) => self.match_particle(particle, context),
            None => {
                if group.particles.iter().all(|p| !p.occurs().is_emptiable()) {
                    context.error(
                        self.parent.local_name(),
                        self.parent.line,
                        format!(
                            "Expected one of {:?} in '{}'",
                            group.expected(),
                            self.parent.local_name()
                        ),
                    );
                }
            }
        }
    }

    fn match_all(&mut self, group: &'a ModelGroup, context: &mut ValidationContext) {
        let mut seen = vec![0u32; group.particles.len()];

        while let Some(child) = self.peek() {
            let slot = group.particles.iter().enumerate().position(|(i, p)| {
                p.accepts(child.local_name()) && !p.occurs().is_over(seen[i])
            });
            match slot {
                Some(slot) => {
                    if let Particle::Element { target, .. } = &group.particles[slot] {
                        self.validate_child(target, child, context);
                    }
                    self.position += 1;
                    seen[slot] += 1;
                }
                None if self.expected_later(child.local_name()) => break,
                None => {
                    self.unexpected(child, context);
                    self.position += 1;
                }
            }
        }

        for (particle, count) in group.particles.iter().zip(seen) {
            if let Particle::Element { target, occurs } = particle {
                if occurs.is_missing(count) {
                    self.missing(target.name(), context);
                }
            }
        }
    }

    fn match_particle(&mut self, particle: &'a Particle, context: &mut ValidationContext) {
        match particle {
            Particle::Element { target, occurs } => {
                let mut count = 0;
                while !occurs.is_over(count) {
                    self.skip_strays(|name| name == target.name(), context);
                    let Some(child) = self.peek().filter(|c| c.local_name() == target.name())
                    else {
                        break;
                    };
                    self.validate_child(target, child, context);
                    self.position += 1;
                    count += 1;
                }

                if occurs.is_missing(count) {
                    if count == 0 {
                        self.missing(target.name(), context);
                    } else {
                        context.error(
                            target.name(),
                            self.parent.line,
                            format!(
                                "Element '{}' occurs {} times in '{}', at least {} required",
                                target.name(),
                                count,
                                self.parent.local_name(),
                                occurs.min
                            ),
                        );
                    }
                }
            }
            Particle::Group(group) => self.match_group(group, context),
            Particle::Any(occurs) => {
                let mut count = 0;
                while !occurs.is_over(count) && self.peek().is_some() {
                    self.position += 1;
                    count += 1;
                }
            }
        }
    }

    fn missing(&self, name: &str, context: &mut ValidationContext) {
        context.error(
            name,
            self.parent.line,
            format!(
                "Missing required element '{}' in '{}'",
                name,
                self.parent.local_name()
            ),
        );
    }

    fn unexpected(&self, child: &Element, context: &mut ValidationContext) {
        context.error_at(
            child,
            format!(
                "Unexpected child element '{}' in '{}'",
                child.local_name(),
                self.parent.local_name()
            ),
        );
    }

    fn validate_child(
        &self,
        target: &'a ElementTarget,
        child: &'a Element,
        context: &mut ValidationContext,
    ) {
        let decl = match target {
            ElementTarget::Ref(name) => self.schema.element(name),
            ElementTarget::Local(decl) => Some(decl.as_ref()),
        };

        match decl {
            Some(decl) => validate_element(self.schema, child, decl, context),
            None => context.error_at(
                child,
                format!("No declaration found for element '{}'", child.local_name()),
            ),
        }
    }
}
