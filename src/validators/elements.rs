//! Element declarations
//!
//! The schema walk only needs a handful of facts about an `xs:element`
//! node: its name or reference, its occurrence attributes and the element
//! declarations nested in its body. [`ElementDecl`] captures those so the
//! introspection logic does not depend on the tree type.

use crate::documents::Element;

use super::particles::{is_required_value, is_unbounded_value};

/// Local names of XSD nodes that may hold nested element declarations
const CONTENT_NODES: &[&str] = &[
    "complexType",
    "complexContent",
    "extension",
    "restriction",
    "sequence",
    "choice",
    "all",
];

/// An element declaration or element reference in a schema
pub trait ElementDecl {
    /// Value of the `name` attribute
    fn name(&self) -> Option<&str>;

    /// Value of the `ref` attribute with any prefix removed
    fn reference(&self) -> Option<&str>;

    /// Raw `minOccurs` attribute
    fn min_occurs(&self) -> Option<&str>;

    /// Raw `maxOccurs` attribute
    fn max_occurs(&self) -> Option<&str>;

    /// Value of the `type` attribute
    fn type_name(&self) -> Option<&str>;

    /// Element declarations nested in this declaration's inline body,
    /// in document order. Declarations nested inside those are not included.
    fn declarations(&self) -> Vec<&Self>;

    /// The name this declaration contributes: `name`, falling back to `ref`
    fn declared_name(&self) -> Option<&str> {
        self.name().or_else(|| self.reference())
    }

    /// `maxOccurs` is the `unbounded` sentinel
    fn is_unbounded(&self) -> bool {
        is_unbounded_value(self.max_occurs())
    }

    /// `minOccurs` is absent or at least 1
    fn is_required(&self) -> bool {
        is_required_value(self.min_occurs())
    }
}

impl ElementDecl for Element {
    fn name(&self) -> Option<&str> {
        self.get_attribute("name")
    }

    fn reference(&self) -> Option<&str> {
        self.get_attribute("ref").map(strip_prefix)
    }

    fn min_occurs(&self) -> Option<&str> {
        self.get_attribute("minOccurs")
    }

    fn max_occurs(&self) -> Option<&str> {
        self.get_attribute("maxOccurs")
    }

    fn type_name(&self) -> Option<&str> {
        self.get_attribute("type")
    }

    fn declarations(&self) -> Vec<&Self> {
        let mut found = Vec::new();
        collect_declarations(self, &mut found);
        found
    }
}

/// Collect `xs:element` nodes reachable from `node` through content nodes
pub fn collect_declarations<'a>(node: &'a Element, found: &mut Vec<&'a Element>) {
    for child in &node.children {
        if child.local_name() == "element" {
            found.push(child);
        } else if CONTENT_NODES.contains(&child.local_name()) {
            collect_declarations(child, found);
        }
    }
}

/// Drop a namespace prefix from a QName value
pub fn strip_prefix(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;

    /// Parse one declaration inside a schema element binding `xs`
    fn parse(xml: &str) -> Element {
        let wrapped = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            xml
        );
        Document::from_string(&wrapped).unwrap().elements.remove(0).children.remove(0)
    }

    #[test]
    fn test_reference_attributes() {
        let node = parse(r#"<xs:element ref="dif:ele" minOccurs="1" maxOccurs="unbounded"/>"#);
        assert_eq!(node.name(), None);
        assert_eq!(node.reference(), Some("ele"));
        assert_eq!(node.declared_name(), Some("ele"));
        assert!(node.is_unbounded());
        assert!(node.is_required());
    }

    #[test]
    fn test_bounded_optional() {
        let node = parse(r#"<xs:element ref="ele" minOccurs="0" maxOccurs="1"/>"#);
        assert!(!node.is_unbounded());
        assert!(!node.is_required());
    }

    #[test]
    fn test_absent_min_occurs_is_required() {
        let node = parse(r#"<xs:element name="ele" type="xs:string"/>"#);
        assert!(node.is_required());
        assert_eq!(node.type_name(), Some("xs:string"));
    }

    #[test]
    fn test_nested_declarations() {
        let node = parse(
            r#"<xs:element name="Personnel">
                 <xs:annotation><xs:documentation>contact</xs:documentation></xs:annotation>
                 <xs:complexType>
                   <xs:sequence>
                     <xs:element ref="Role" maxOccurs="unbounded"/>
                     <xs:choice>
                       <xs:element name="Email"/>
                       <xs:element name="Phone">
                         <xs:complexType><xs:sequence><xs:element name="Number"/></xs:sequence></xs:complexType>
                       </xs:element>
                     </xs:choice>
                   </xs:sequence>
                 </xs:complexType>
               </xs:element>"#,
        );

        let names: Vec<&str> = node
            .declarations()
            .iter()
            .filter_map(|d| d.declared_name())
            .collect();
        assert_eq!(names, vec!["Role", "Email", "Phone"]);
    }

    #[test]
    fn test_leaf_has_no_declarations() {
        let node = parse(r#"<xs:element name="Entry_ID" type="xs:string"/>"#);
        assert!(node.declarations().is_empty());
    }
}
