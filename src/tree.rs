//! Owning XML element tree
//!
//! Each element exclusively owns its children. Attaching a node moves it
//! into its parent, so a node can never end up under two parents, and
//! dropping any node releases its whole subtree once.
//!
//! The mutating primitives are fallible: names are checked against the XML
//! name grammar and storage is reserved with `try_reserve`, so a refusal
//! surfaces as an error instead of an abort.

pub mod reader;

use indexmap::IndexMap;

use crate::error::{Error, Result};

pub use reader::{Reader, ReaderConfig};

/// Namespace binding: optional prefix and URI
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: Option<String>,
    uri: String,
}

impl Namespace {
    /// Default (unprefixed) namespace
    pub fn default_ns(uri: impl Into<String>) -> Self {
        Self {
            prefix: None,
            uri: uri.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_default(&self) -> bool {
        self.prefix.is_none()
    }
}

/// XML element
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    name: String,
    namespace: Option<Namespace>,
    namespace_decls: Vec<Namespace>,
    attributes: IndexMap<String, String>,
    children: Vec<Content>,
}

/// XML content node
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Element(Element),
    Text(String),
}

impl Element {
    /// Create an element with a local tag name
    pub fn new(name: &str) -> Result<Self> {
        if !is_ncname(name) {
            return Err(Error::construction(
                "Element::new",
                format!("invalid element name '{name}'"),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            namespace: None,
            namespace_decls: Vec::new(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag as written: `prefix:name` for prefixed namespaces
    pub fn qualified_name(&self) -> String {
        match self.namespace.as_ref().and_then(Namespace::prefix) {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Associate this element with a namespace
    pub fn set_namespace(&mut self, namespace: Option<Namespace>) {
        self.namespace = namespace;
    }

    /// Namespaces declared on this element
    pub fn namespace_decls(&self) -> &[Namespace] {
        &self.namespace_decls
    }

    /// Declare a namespace on this element and return the binding
    ///
    /// Fails if the prefix is not a valid name, is reserved, is already
    /// declared on this element, or the URI is empty.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) -> Result<Namespace> {
        const OP: &str = "Element::declare_namespace";

        if uri.is_empty() {
            return Err(Error::construction(OP, "empty namespace uri"));
        }
        if let Some(prefix) = prefix {
            if !is_ncname(prefix) || prefix == "xml" || prefix == "xmlns" {
                return Err(Error::construction(
                    OP,
                    format!("invalid namespace prefix '{prefix}'"),
                ));
            }
        }
        if self.namespace_decls.iter().any(|ns| ns.prefix() == prefix) {
            return Err(Error::construction(
                OP,
                format!("namespace prefix '{}' already declared", prefix.unwrap_or("")),
            ));
        }
        self.namespace_decls
            .try_reserve(1)
            .map_err(|_| Error::exhausted(OP, "namespace declaration"))?;

        let ns = Namespace {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
        };
        self.namespace_decls.push(ns.clone());
        Ok(ns)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attributes in insertion order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set an attribute; an existing key keeps its position
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        const OP: &str = "Element::set_attribute";

        if !is_qname(key) {
            return Err(Error::construction(
                OP,
                format!("invalid attribute name '{key}' on {}", self.name),
            ));
        }
        if let Some(bad) = forbidden_char(value) {
            return Err(Error::construction(
                OP,
                format!("attribute {key} contains U+{:04X}, not allowed in XML", u32::from(bad)),
            ));
        }
        if let Some(existing) = self.attributes.get_mut(key) {
            value.clone_into(existing);
            return Ok(());
        }
        self.attributes
            .try_reserve(1)
            .map_err(|_| Error::exhausted(OP, format!("attribute {key}")))?;
        self.attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn children(&self) -> &[Content] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Content] {
        &mut self.children
    }

    /// Child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    /// Concatenated text children, if there are any
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        let mut found = false;
        for child in &self.children {
            if let Content::Text(value) = child {
                text.push_str(value);
                found = true;
            }
        }
        found.then_some(text)
    }

    /// Move `child` under this element, after any existing children
    pub fn append_child(&mut self, child: Self) -> Result<()> {
        self.push_content(Content::Element(child))
    }

    /// Append a text node; fails on characters XML 1.0 cannot carry
    pub fn append_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if let Some(bad) = forbidden_char(&text) {
            return Err(Error::construction(
                "Element::append_text",
                format!("text in {} contains U+{:04X}, not allowed in XML", self.name, u32::from(bad)),
            ));
        }
        self.push_content(Content::Text(text))
    }

    fn push_content(&mut self, content: Content) -> Result<()> {
        self.children
            .try_reserve(1)
            .map_err(|_| Error::exhausted("Element::append_child", format!("child of {}", self.name)))?;
        self.children.push(content);
        Ok(())
    }

    /// Number of elements in this subtree, including this one
    pub fn element_count(&self) -> usize {
        1 + self.child_elements().map(Self::element_count).sum::<usize>()
    }
}

/// XML document owning a single root element
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Parse a well-formed XML document with default limits
    pub fn parse(input: &str) -> Result<Self> {
        Reader::new(input.as_bytes()).parse()
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }
}

pub(crate) fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_') || b >= 0x80
}

pub(crate) fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// First character outside the XML 1.0 `Char` production, if any
pub(crate) fn forbidden_char(text: &str) -> Option<char> {
    text.chars().find(|&c| {
        !matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    })
}

/// Name without a colon
pub(crate) fn is_ncname(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if is_name_start(first) => bytes.all(is_name_char),
        _ => false,
    }
}

/// Name with at most one colon separating two non-empty parts
pub(crate) fn is_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_element_names() {
        assert!(Element::new("PARAM").is_ok());
        assert!(Element::new("TABLE_DATA-1.x").is_ok());
        for bad in ["", "1TD", "a b", "vot:PARAM", "<TR"] {
            let err = Element::new(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConstructionFailed, "{bad}");
        }
    }

    #[test]
    fn test_attributes_keep_order_and_replace() {
        let mut el = Element::new("FIELD").unwrap();
        el.set_attribute("name", "freq").unwrap();
        el.set_attribute("datatype", "double").unwrap();
        el.set_attribute("name", "f0").unwrap();

        let attrs: Vec<_> = el.attributes().collect();
        assert_eq!(attrs, vec![("name", "f0"), ("datatype", "double")]);
        assert!(el.set_attribute("bad name", "x").is_err());
        assert!(el.set_attribute("xsi:type", "x").is_ok());
    }

    #[test]
    fn test_append_moves_children_in_order() {
        let mut parent = Element::new("RESOURCE").unwrap();
        parent.append_child(Element::new("PARAM").unwrap()).unwrap();
        parent.append_text("note").unwrap();
        parent.append_child(Element::new("TABLE").unwrap()).unwrap();

        let names: Vec<_> = parent.child_elements().map(Element::name).collect();
        assert_eq!(names, vec!["PARAM", "TABLE"]);
        assert_eq!(parent.text().as_deref(), Some("note"));
        assert_eq!(parent.element_count(), 3);
    }

    #[test]
    fn test_declare_namespace() {
        let mut el = Element::new("VOTABLE").unwrap();
        let ns = el.declare_namespace(None, "urn:a").unwrap();
        assert!(ns.is_default());
        assert!(el.declare_namespace(None, "urn:b").is_err());
        assert!(el.declare_namespace(Some("xsi"), "urn:xsi").is_ok());
        assert!(el.declare_namespace(Some("xmlns"), "urn:c").is_err());
        assert!(el.declare_namespace(Some("p"), "").is_err());
        assert_eq!(el.namespace_decls().len(), 2);
    }

    #[test]
    fn test_forbidden_characters() {
        let mut el = Element::new("PARAM").unwrap();
        for bad in ["a\u{1}b", "\u{0}", "x\u{b}", "\u{c}", "\u{1f}", "\u{fffe}", "\u{ffff}"] {
            let err = el.set_attribute("value", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConstructionFailed, "{bad:?}");
            let err = el.append_text(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConstructionFailed, "{bad:?}");
        }
        assert!(el.attributes().next().is_none());
        assert!(el.children().is_empty());

        el.set_attribute("value", "tab\tcr\rlf\n \u{e9} \u{1f600}").unwrap();
        el.append_text("\u{d7ff}\u{e000}\u{fffd}\u{10000}").unwrap();
    }

    #[test]
    fn test_qualified_name() {
        let mut el = Element::new("PARAM").unwrap();
        assert_eq!(el.qualified_name(), "PARAM");
        el.set_namespace(Some(Namespace::prefixed("vot", "urn:v")));
        assert_eq!(el.qualified_name(), "vot:PARAM");
    }
}
