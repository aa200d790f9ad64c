//! Element descriptors and hash templates
//!
//! An [`ElementInfo`] records what the schema says about one element. A
//! [`Template`] is the empty skeleton of an instance document derived from
//! those descriptors: text for single leaves, lists for repeatable elements
//! and maps for containers.

use indexmap::IndexMap;
use serde::Serialize;

/// Descriptor of a schema element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementInfo {
    /// minOccurs is absent or at least 1
    pub required: bool,
    /// maxOccurs is `unbounded`
    pub unbounded: bool,
    /// Descriptors of nested elements; `None` for leaves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<IndexMap<String, ElementInfo>>,
}

impl ElementInfo {
    /// Create a leaf descriptor
    pub fn new(required: bool, unbounded: bool) -> Self {
        Self {
            required,
            unbounded,
            children: None,
        }
    }

    /// Attach child descriptors, turning this into a container
    pub fn with_children(mut self, children: IndexMap<String, ElementInfo>) -> Self {
        self.children = Some(children);
        self
    }

    /// True when no `children` entry is present
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Element name to descriptor, in walk order
pub type InfoMap = IndexMap<String, ElementInfo>;

/// Placeholder value mirroring the shape of an instance document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Template {
    /// Single leaf value
    Text(String),
    /// Repeatable element
    List(Vec<Template>),
    /// Container element
    Map(IndexMap<String, Template>),
}

impl Template {
    /// Check for a text placeholder
    pub fn is_text(&self) -> bool {
        matches!(self, Template::Text(_))
    }

    /// Check for a list placeholder
    pub fn is_list(&self) -> bool {
        matches!(self, Template::List(_))
    }

    /// Check for a map placeholder
    pub fn is_map(&self) -> bool {
        matches!(self, Template::Map(_))
    }

    /// Borrow the list items
    pub fn as_list(&self) -> Option<&[Template]> {
        match self {
            Template::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the map entries
    pub fn as_map(&self) -> Option<&IndexMap<String, Template>> {
        match self {
            Template::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Render as JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Template::Text(text) => serde_json::Value::String(text.clone()),
            Template::List(items) => {
                serde_json::Value::Array(items.iter().map(Template::to_json).collect())
            }
            Template::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Element name to placeholder, in walk order
pub type TemplateMap = IndexMap<String, Template>;

/// Build the placeholder for a descriptor.
///
/// | children | unbounded | result |
/// |---|---|---|
/// | none | no | `""` |
/// | none | yes | `[]` |
/// | some | no | `{child: ...}` |
/// | some | yes | `[{child: ...}]` |
pub fn generate_structure(info: &ElementInfo) -> Template {
    match (&info.children, info.unbounded) {
        (None, false) => Template::Text(String::new()),
        (None, true) => Template::List(Vec::new()),
        (Some(children), unbounded) => {
            let map = Template::Map(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), generate_structure(child)))
                    .collect(),
            );
            if unbounded {
                Template::List(vec![map])
            } else {
                map
            }
        }
    }
}
