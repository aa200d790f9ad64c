//! XML document trees
//!
//! Schema and instance documents are both parsed into this tree. Element
//! names are resolved to namespace URIs while parsing. Text nodes that only
//! contain whitespace are dropped, other text is kept as written, and a
//! document may hold several top-level elements so that concatenated records
//! survive.

use crate::error::{Error, Result};
use crate::limits::Limits;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Local name (prefix stripped)
    pub name: String,
    /// Namespace prefix as written in the source
    pub prefix: Option<String>,
    /// Namespace URI the name resolves to; `None` when unqualified
    pub namespace: Option<String>,
    /// Attributes keyed by their name as written (`maxOccurs`, `xsi:schemaLocation`)
    pub attributes: IndexMap<String, String>,
    /// Namespace declarations made on this element; the default namespace uses `""`
    pub namespaces: IndexMap<String, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// 1-based line of the start tag
    pub line: usize,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            namespace: None,
            attributes: IndexMap::new(),
            namespaces: IndexMap::new(),
            text: None,
            children: Vec::new(),
            line: 0,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// Namespace URI of the element, if it has one
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Name with its prefix, as written in the source
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    /// Get an attribute value by name.
    ///
    /// An exact match wins; otherwise a prefixed attribute whose local part
    /// equals `name` is returned.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value);
        }
        self.attributes
            .iter()
            .find(|(key, _)| key.rsplit_once(':').map(|(_, local)| local) == Some(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn push_text(&mut self, text: &str) {
        match self.text {
            Some(ref mut existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Text content, empty when the element has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First child element with the given local name
    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.local_name() == local_name)
    }

    /// All elements below this one in document order (excluding self)
    pub fn descendants(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            found.push(element);
            stack.extend(element.children.iter().rev());
        }
        found
    }
}

/// XML Document representation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Top-level elements in document order; well-formed XML has exactly one
    pub elements: Vec<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes with default limits
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = NsReader::from_reader(xml);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();
        let mut line = 1;
        let mut scanned = 0;

        loop {
            // Text is not trimmed, so the next event starts exactly here
            let start = reader.buffer_position().min(xml.len());
            line += xml[scanned..start].iter().filter(|&&b| b == b'\n').count();
            scanned = start;

            let (namespace, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok((resolved, event)) => (namespace_uri(resolved, line)?, event),
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at line {}: {}",
                        line, e
                    )))
                }
            };

            match event {
                Event::Start(e) => {
                    let mut element = Self::parse_element(&e, limits)?;
                    element.namespace = namespace;
                    element.line = line;
                    element_stack.push(element);
                    limits.check_xml_depth(element_stack.len())?;
                }
                Event::End(_) => {
                    if let Some(current) = element_stack.pop() {
                        match element_stack.last_mut() {
                            Some(parent) => parent.add_child(current),
                            None => doc.elements.push(current),
                        }
                    }
                }
                Event::Empty(e) => {
                    let mut element = Self::parse_element(&e, limits)?;
                    element.namespace = namespace;
                    element.line = line;
                    match element_stack.last_mut() {
                        Some(parent) => parent.add_child(element),
                        None => doc.elements.push(element),
                    }
                }
                Event::Text(e) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        if !text.trim().is_empty() {
                            current.push_text(&text);
                        }
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = element_stack.last_mut() {
                        let bytes = e.into_inner();
                        current.push_text(&String::from_utf8_lossy(&bytes));
                    }
                }
                Event::Eof => break,
                _ => {} // Comments, processing instructions, doctype
            }
            buf.clear();
        }

        if let Some(open) = element_stack.last() {
            return Err(Error::Xml(format!(
                "Unclosed element '{}' opened at line {}",
                open.qualified_name(),
                open.line
            )));
        }

        if doc.elements.is_empty() {
            return Err(Error::Xml("Document has no root element".to_string()));
        }

        Ok(doc)
    }

    /// Parse element from BytesStart event
    fn parse_element(start: &BytesStart, limits: &Limits) -> Result<Element> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;

        let mut element = match name.split_once(':') {
            Some((prefix, local)) => {
                let mut element = Element::new(local);
                element.prefix = Some(prefix.to_string());
                element
            }
            None => Element::new(name),
        };

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                element.namespaces.insert(String::new(), attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                element.namespaces.insert(prefix.to_string(), attr_value);
            } else {
                element.set_attribute(attr_name, attr_value);
            }
        }

        limits.check_attributes(element.attributes.len())?;

        Ok(element)
    }

    /// Get the root element (the first top-level element)
    pub fn root(&self) -> Option<&Element> {
        self.elements.first()
    }

    /// Elements named `name`, searched from the top level down.
    ///
    /// A matching element is collected and not searched further, so records
    /// nested inside a wrapper (a harvesting envelope, say) are found while
    /// elements inside a record are not mistaken for records themselves.
    pub fn records(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.elements.iter().rev().collect();
        while let Some(element) = stack.pop() {
            if element.local_name() == name {
                found.push(element);
            } else {
                stack.extend(element.children.iter().rev());
            }
        }
        found
    }
}

/// Turn a resolved element name into an owned namespace URI
fn namespace_uri(resolved: ResolveResult<'_>, line: usize) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Xml(format!(
            "Unknown namespace prefix '{}' at line {}",
            String::from_utf8_lossy(&prefix),
            line
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text(), "text");
    }

    #[test]
    fn test_whitespace_text_is_dropped() {
        let xml = "<root>\n   <child>  </child>\n</root>";
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert!(root.text.is_none());
        assert!(root.children[0].text.is_none());
    }

    #[test]
    fn test_parse_prefixed_names_and_attributes() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:schemaLocation="a b"><xs:element name="DIF"/></xs:schema>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.local_name(), "schema");
        assert_eq!(root.qualified_name(), "xs:schema");
        assert_eq!(
            root.namespaces.get("xs").map(String::as_str),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(root.get_attribute("schemaLocation"), Some("a b"));
        assert_eq!(root.get_attribute("xsi:schemaLocation"), Some("a b"));
        assert_eq!(root.children[0].get_attribute("name"), Some("DIF"));
    }

    #[test]
    fn test_line_numbers() {
        let xml = "<root>\n<a/>\n\n<b>x</b>\n</root>";
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.line, 1);
        assert_eq!(root.children[0].line, 2);
        assert_eq!(root.children[1].line, 4);
    }

    #[test]
    fn test_multi_line_start_tag_reports_opening_line() {
        let xml = "<root\n  a=\"1\">\n<child\n  x=\"2\"\n/>\n<last>v</last>\n</root>";
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.line, 1);
        assert_eq!(root.children[0].line, 3);
        assert_eq!(root.children[1].line, 6);
    }

    #[test]
    fn test_padded_text_is_kept() {
        let doc = Document::from_string("<a><b>  padded value </b>\n  <c>\tx</c></a>").unwrap();

        let root = doc.root().unwrap();
        assert!(root.text.is_none());
        assert_eq!(root.children[0].text(), "  padded value ");
        assert_eq!(root.children[1].text(), "\tx");
    }

    #[test]
    fn test_namespaces_are_resolved() {
        let xml = r#"<DIF xmlns="urn:dif" xmlns:o="urn:other">
            <Entry_ID>x</Entry_ID>
            <o:Note/>
            <Plain xmlns=""><Inner/></Plain>
        </DIF>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.namespace(), Some("urn:dif"));
        assert_eq!(root.children[0].namespace(), Some("urn:dif"));
        assert_eq!(root.children[1].namespace(), Some("urn:other"));
        assert_eq!(root.children[1].prefix.as_deref(), Some("o"));
        assert_eq!(root.children[2].namespace(), None);
        assert_eq!(root.children[2].children[0].namespace(), None);

        let bare = Document::from_string("<DIF><Entry_ID/></DIF>").unwrap();
        assert_eq!(bare.root().unwrap().namespace(), None);
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        let err = Document::from_string("<root>\n<x:child/></root>").unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
        assert!(err.to_string().contains("'x'"));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_concatenated_top_level_elements() {
        let xml = "<DIF><Entry_ID>1</Entry_ID></DIF><DIF><Entry_ID>2</Entry_ID></DIF>";
        let doc = Document::from_string(xml).unwrap();

        assert_eq!(doc.elements.len(), 2);
        let records = doc.records("DIF");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].children[0].text(), "2");
    }

    #[test]
    fn test_records_inside_wrapper() {
        let xml = "<OAI-PMH><ListRecords><record><metadata><DIF/></metadata></record>\
                   <record><metadata><DIF/></metadata></record></ListRecords></OAI-PMH>";
        let doc = Document::from_string(xml).unwrap();

        assert_eq!(doc.records("DIF").len(), 2);
        assert!(doc.records("Entry_ID").is_empty());
    }

    #[test]
    fn test_descendants_in_document_order() {
        let xml = "<a><b><c/></b><d/></a>";
        let doc = Document::from_string(xml).unwrap();

        let names: Vec<&str> = doc
            .root()
            .unwrap()
            .descendants()
            .iter()
            .map(|e| e.local_name())
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_malformed_xml() {
        assert!(Document::from_string("<root><child></root>").is_err());
        assert!(Document::from_string("<root>").is_err());
        assert!(Document::from_string("just text").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        let result = Document::parse_with_limits(b"<a><b><c/></b></a>", &limits);
        assert!(result.is_ok());

        let result = Document::parse_with_limits(b"<a><b><c><d/></c></b></a>", &limits);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }
}
